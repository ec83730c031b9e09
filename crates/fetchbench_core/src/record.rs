use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{Bucket, Classification, Outcome, SequenceIndex, UrlTask};

/// One line of the per-URL trace. Built once, at the task's terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub url: String,
    pub sequence: SequenceIndex,
    pub classification: Classification,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub body_len: u64,
    pub redirects: u32,
}

impl ResultRecord {
    pub fn new(
        task: &UrlTask,
        outcome: Outcome,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        redirects: u32,
    ) -> Self {
        Self {
            url: task.url.clone(),
            sequence: task.sequence,
            classification: outcome.classification(),
            started_at,
            duration_ms,
            body_len: outcome.body_len(),
            redirects,
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.classification.bucket()
    }

    /// `url,classification,startTimeISO8601,durationMs,bodyLength`
    pub fn trace_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.url,
            self.classification,
            self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.duration_ms,
            self.body_len
        )
    }
}
