use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use engine_logging::{engine_debug, engine_trace};
use fetchbench_core::{ErrorKind, Outcome, ResultRecord, UrlTask};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::fetch::Fetcher;

/// Drives one task through its redirect chain under a single deadline.
pub struct RedirectResolver {
    fetcher: Arc<dyn Fetcher>,
    request_timeout: Duration,
    max_redirects: u32,
}

impl RedirectResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, request_timeout: Duration, max_redirects: u32) -> Self {
        Self {
            fetcher,
            request_timeout,
            max_redirects,
        }
    }

    /// Always produces exactly one record; failures are folded into it.
    pub async fn resolve(&self, task: &UrlTask, cancel: &CancellationToken) -> ResultRecord {
        let started_at = Utc::now();
        let chain_start = Instant::now();

        let (outcome, redirects) = self.follow(task, chain_start, cancel).await;

        let duration_ms = u64::try_from(chain_start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let record = ResultRecord::new(task, outcome, started_at, duration_ms, redirects);
        engine_debug!(
            "task {} done url={} classification={} duration_ms={} redirects={}",
            task.sequence,
            task.url,
            record.classification,
            duration_ms,
            redirects
        );
        record
    }

    async fn follow(
        &self,
        task: &UrlTask,
        chain_start: Instant,
        cancel: &CancellationToken,
    ) -> (Outcome, u32) {
        let deadline = chain_start + self.request_timeout;
        let mut current = match Url::parse(&task.url) {
            Ok(url) => url,
            Err(err) => {
                engine_debug!("task {} has an unusable url {:?}: {}", task.sequence, task.url, err);
                return (Outcome::Failure(ErrorKind::ProtocolError), 0);
            }
        };
        let mut hops = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return (Outcome::Failure(ErrorKind::Timeout), hops);
            }

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return (Outcome::Failure(ErrorKind::Cancelled), hops),
                attempt = tokio::time::timeout(remaining, self.fetcher.fetch(&current, remaining)) => attempt,
            };
            let response = match attempt {
                Err(_elapsed) => return (Outcome::Failure(ErrorKind::Timeout), hops),
                Ok(Err(err)) => {
                    engine_debug!("task {} hop {} failed: {}", task.sequence, hops, err);
                    return (Outcome::Failure(err.kind), hops);
                }
                Ok(Ok(response)) => response,
            };
            if Instant::now() >= deadline {
                return (Outcome::Failure(ErrorKind::Timeout), hops);
            }

            let Some(next) = response.redirect_target(&current) else {
                return (
                    Outcome::Success {
                        status: response.status,
                        body_len: response.body_len,
                    },
                    hops,
                );
            };
            if hops >= self.max_redirects {
                return (Outcome::Failure(ErrorKind::TooManyRedirects), hops);
            }
            engine_trace!("task {} redirect {} -> {}", task.sequence, current, next);
            hops += 1;
            current = next;
        }
    }
}
