use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Bucket, ResultRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    #[serde(rename = "2xx")]
    pub success: u64,
    #[serde(rename = "3xx")]
    pub redirection: u64,
    #[serde(rename = "4xx")]
    pub client_error: u64,
    #[serde(rename = "5xx")]
    pub server_error: u64,
    #[serde(rename = "Exception")]
    pub exception: u64,
}

impl BucketCounts {
    pub fn get(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Success => self.success,
            Bucket::Redirection => self.redirection,
            Bucket::ClientError => self.client_error,
            Bucket::ServerError => self.server_error,
            Bucket::Exception => self.exception,
        }
    }

    pub fn total(&self) -> u64 {
        Bucket::ALL.iter().map(|bucket| self.get(*bucket)).sum()
    }

    fn increment(&mut self, bucket: Bucket) {
        let slot = match bucket {
            Bucket::Success => &mut self.success,
            Bucket::Redirection => &mut self.redirection,
            Bucket::ClientError => &mut self.client_error,
            Bucket::ServerError => &mut self.server_error,
            Bucket::Exception => &mut self.exception,
        };
        *slot += 1;
    }
}

/// Running statistics over every record seen so far.
///
/// Durations are retained so the median is exact; memory grows by one `u64`
/// per record.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateState {
    buckets: BucketCounts,
    statuses: BTreeMap<String, u64>,
    total_duration_ms: u64,
    min_duration_ms: Option<u64>,
    max_duration_ms: Option<u64>,
    durations_ms: Vec<u64>,
    success_body_bytes: u64,
    started_at: DateTime<Utc>,
}

impl AggregateState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            buckets: BucketCounts::default(),
            statuses: BTreeMap::new(),
            total_duration_ms: 0,
            min_duration_ms: None,
            max_duration_ms: None,
            durations_ms: Vec::new(),
            success_body_bytes: 0,
            started_at,
        }
    }

    pub fn records(&self) -> u64 {
        self.durations_ms.len() as u64
    }

    pub fn buckets(&self) -> BucketCounts {
        self.buckets
    }

    /// Closes the run. Every derived rate is guarded: an empty run reports
    /// `None` for the averages and `0.0` for throughput.
    pub fn finalize(mut self, finished_at: DateTime<Utc>) -> Summary {
        let total = self.records();
        let wall_clock_secs =
            (finished_at - self.started_at).num_milliseconds().max(0) as f64 / 1000.0;

        self.durations_ms.sort_unstable();
        let median_duration_ms = median(&self.durations_ms);
        let avg_duration_ms = ratio(self.total_duration_ms, total);
        let avg_body_len_2xx = ratio(self.success_body_bytes, self.buckets.success);
        let success_ratio = ratio(self.buckets.success, total);
        let throughput_2xx_per_sec = if wall_clock_secs > 0.0 {
            self.buckets.success as f64 / wall_clock_secs
        } else {
            0.0
        };

        Summary {
            total_urls: total,
            buckets: self.buckets,
            statuses: self.statuses,
            avg_duration_ms,
            median_duration_ms,
            min_duration_ms: self.min_duration_ms,
            max_duration_ms: self.max_duration_ms,
            throughput_2xx_per_sec,
            avg_body_len_2xx,
            success_ratio,
            wall_clock_secs,
            started_at: self.started_at,
            finished_at,
        }
    }
}

/// Folds one record into the running state.
pub fn fold(mut state: AggregateState, record: &ResultRecord) -> AggregateState {
    let bucket = record.bucket();
    state.buckets.increment(bucket);
    *state
        .statuses
        .entry(record.classification.to_string())
        .or_insert(0) += 1;

    let duration = record.duration_ms;
    state.total_duration_ms = state.total_duration_ms.saturating_add(duration);
    state.min_duration_ms = Some(
        state
            .min_duration_ms
            .map_or(duration, |min| min.min(duration)),
    );
    state.max_duration_ms = Some(
        state
            .max_duration_ms
            .map_or(duration, |max| max.max(duration)),
    );
    state.durations_ms.push(duration);

    if bucket == Bucket::Success {
        state.success_body_bytes = state.success_body_bytes.saturating_add(record.body_len);
    }
    state
}

fn ratio(sum: u64, count: u64) -> Option<f64> {
    (count > 0).then(|| sum as f64 / count as f64)
}

fn median(sorted: &[u64]) -> Option<f64> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        Some(sorted[mid] as f64)
    } else {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    }
}

/// Final statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_urls: u64,
    pub buckets: BucketCounts,
    /// Exact histogram keyed by classification (`"200"`, `"Timeout"`, ...).
    pub statuses: BTreeMap<String, u64>,
    pub avg_duration_ms: Option<f64>,
    pub median_duration_ms: Option<f64>,
    pub min_duration_ms: Option<u64>,
    pub max_duration_ms: Option<u64>,
    pub throughput_2xx_per_sec: f64,
    pub avg_body_len_2xx: Option<f64>,
    /// Share of all URLs that ended in 2xx, in `0.0..=1.0`.
    pub success_ratio: Option<f64>,
    pub wall_clock_secs: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Summary {
    /// The classification histogram, most frequent first. Equal counts keep
    /// key order.
    pub fn statuses_by_count(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self
            .statuses
            .iter()
            .map(|(classification, count)| (classification.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}
