use std::sync::Arc;

use chrono::Utc;
use engine_logging::{engine_error, engine_info, engine_trace, engine_warn};
use fetchbench_core::{fold, AggregateState, ErrorKind, Outcome, ResultRecord, Summary, UrlTask};
use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::limiter::{Limiter, LimiterStats, Slot};
use crate::resolve::RedirectResolver;
use crate::settings::{EngineSettings, Strategy};
use crate::source::{SourceError, UrlStream};

/// Receives every record as soon as its task completes.
pub trait RecordSink: Send {
    fn emit(&mut self, record: &ResultRecord);
}

/// Sink that keeps every record, in completion order.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<ResultRecord>,
}

impl RecordSink for VecSink {
    fn emit(&mut self, record: &ResultRecord) {
        self.records.push(record.clone());
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: Summary,
    pub limiter: LimiterStats,
    /// Set when reading the source failed part way. Admission stopped there;
    /// tasks already admitted were still resolved and reported.
    pub source_error: Option<SourceError>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("dispatcher task failed: {0}")]
    Dispatcher(#[from] JoinError),
}

pub struct Engine {
    settings: EngineSettings,
    resolver: Arc<RedirectResolver>,
}

impl Engine {
    pub fn new(settings: EngineSettings, fetcher: Arc<dyn Fetcher>) -> Self {
        let resolver = Arc::new(RedirectResolver::new(
            fetcher,
            settings.request_timeout,
            settings.max_redirects,
        ));
        Self { settings, resolver }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Drains `source`, resolving at most `concurrency` tasks at a time.
    ///
    /// The calling task is the only writer of the aggregate: records arrive
    /// over a channel, go to `sink`, then get folded.
    pub async fn run(
        &self,
        source: UrlStream,
        sink: &mut dyn RecordSink,
        cancel: CancellationToken,
    ) -> Result<RunReport, EngineError> {
        let limiter = Limiter::new(self.settings.concurrency);
        // Bounded so a slow sink pushes back on the fetch tasks.
        let (record_tx, mut record_rx) = mpsc::channel(limiter.capacity());
        let dispatch = Dispatch {
            resolver: Arc::clone(&self.resolver),
            limiter: limiter.clone(),
            cancel,
            records: record_tx,
        };

        engine_info!(
            "run started strategy={} concurrency={} request_timeout={:?} max_redirects={}",
            self.settings.strategy,
            limiter.capacity(),
            self.settings.request_timeout,
            self.settings.max_redirects
        );
        let mut state = AggregateState::new(Utc::now());
        let dispatcher = match self.settings.strategy {
            Strategy::Semaphore => tokio::spawn(dispatch.per_task(source)),
            Strategy::WorkerPool => {
                let workers = limiter.capacity();
                tokio::spawn(dispatch.worker_pool(source, workers))
            }
        };

        while let Some(record) = record_rx.recv().await {
            sink.emit(&record);
            state = fold(state, &record);
        }
        let source_result = dispatcher.await?;

        let summary = state.finalize(Utc::now());
        let limiter = limiter.stats();
        engine_info!(
            "run finished urls={} wall_clock_secs={:.3} acquired={} released={} peak_active={}",
            summary.total_urls,
            summary.wall_clock_secs,
            limiter.acquired,
            limiter.released,
            limiter.peak_active
        );

        Ok(RunReport {
            summary,
            limiter,
            source_error: source_result.err(),
        })
    }
}

#[derive(Clone)]
struct Dispatch {
    resolver: Arc<RedirectResolver>,
    limiter: Limiter,
    cancel: CancellationToken,
    records: mpsc::Sender<ResultRecord>,
}

impl Dispatch {
    /// Pulls the next task, or `None` once the source ends or the run is cancelled.
    async fn next_task(
        &self,
        source: &mut UrlStream,
        sequence: &mut u64,
    ) -> Option<Result<UrlTask, SourceError>> {
        let item = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                engine_warn!("run cancelled, no further urls are admitted");
                return None;
            }
            item = source.next() => item?,
        };
        Some(item.map(|url| {
            let task = UrlTask::new(url, *sequence);
            *sequence += 1;
            task
        }))
    }

    async fn process(&self, task: UrlTask, slot: Slot) {
        let record = self.resolver.resolve(&task, &self.cancel).await;
        // The slot is held until the record is queued, so a full channel
        // stops new fetches from starting.
        self.emit(record).await;
        drop(slot);
    }

    async fn emit(&self, record: ResultRecord) {
        // The receiver lives until every sender is gone.
        let _ = self.records.send(record).await;
    }

    async fn emit_cancelled(&self, task: &UrlTask) {
        self.emit(ResultRecord::new(
            task,
            Outcome::Failure(ErrorKind::Cancelled),
            Utc::now(),
            0,
            0,
        ))
        .await;
    }

    /// One spawned task per URL; the dispatcher takes the slot before spawning
    /// so the source is never read ahead of capacity.
    async fn per_task(self, mut source: UrlStream) -> Result<(), SourceError> {
        let mut tasks = JoinSet::new();
        let mut sequence = 0;
        let mut result = Ok(());

        while let Some(next) = self.next_task(&mut source, &mut sequence).await {
            let task = match next {
                Ok(task) => task,
                Err(err) => {
                    engine_error!("stopping admission: {}", err);
                    result = Err(err);
                    break;
                }
            };
            let Some(slot) = self.limiter.acquire(&self.cancel).await else {
                self.emit_cancelled(&task).await;
                break;
            };
            let dispatch = self.clone();
            tasks.spawn(async move { dispatch.process(task, slot).await });

            while let Some(joined) = tasks.try_join_next() {
                log_join_failure(joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join_failure(joined);
        }
        result
    }

    /// `workers` long-lived tasks share one bounded queue of pending tasks.
    async fn worker_pool(self, mut source: UrlStream, workers: usize) -> Result<(), SourceError> {
        let (task_tx, task_rx) = mpsc::channel::<UrlTask>(workers);
        let task_rx = Arc::new(Mutex::new(task_rx));

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let dispatch = self.clone();
            let task_rx = Arc::clone(&task_rx);
            pool.spawn(async move { dispatch.work(worker, task_rx).await });
        }

        let mut sequence = 0;
        let mut result = Ok(());
        while let Some(next) = self.next_task(&mut source, &mut sequence).await {
            let task = match next {
                Ok(task) => task,
                Err(err) => {
                    engine_error!("stopping admission: {}", err);
                    result = Err(err);
                    break;
                }
            };
            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => false,
                sent = task_tx.send(task.clone()) => sent.is_ok(),
            };
            if !sent {
                self.emit_cancelled(&task).await;
                break;
            }
        }
        drop(task_tx);

        while let Some(joined) = pool.join_next().await {
            log_join_failure(joined);
        }
        result
    }

    async fn work(self, worker: usize, tasks: Arc<Mutex<mpsc::Receiver<UrlTask>>>) {
        loop {
            let next = tasks.lock().await.recv().await;
            let Some(task) = next else {
                break;
            };
            match self.limiter.acquire(&self.cancel).await {
                Some(slot) => self.process(task, slot).await,
                None => self.emit_cancelled(&task).await,
            }
        }
        engine_trace!("worker {} drained", worker);
    }
}

fn log_join_failure(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        engine_error!("fetch task ended abnormally: {}", err);
    }
}
