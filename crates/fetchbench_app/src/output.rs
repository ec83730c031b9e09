use std::fmt::Write as _;
use std::io::{self, Write};

use engine_logging::engine_error;
use fetchbench_core::{Bucket, ResultRecord};
use fetchbench_engine::{RecordSink, RunReport};
use serde_json::json;

use crate::cli::OutputFormat;

/// Writes each record to stdout as soon as it arrives.
pub struct StdoutSink {
    format: OutputFormat,
    out: io::Stdout,
    write_failed: bool,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            out: io::stdout(),
            write_failed: false,
        }
    }
}

impl RecordSink for StdoutSink {
    fn emit(&mut self, record: &ResultRecord) {
        let line = match render_record(record, self.format) {
            Ok(line) => line,
            Err(err) => {
                engine_error!("cannot render record for {}: {}", record.url, err);
                return;
            }
        };
        let mut out = self.out.lock();
        let written = writeln!(out, "{line}").and_then(|()| out.flush());
        // A closed stdout must not stop the run; report it once.
        if let Err(err) = written {
            if !self.write_failed {
                engine_error!("writing records to stdout failed: {}", err);
                self.write_failed = true;
            }
        }
    }
}

fn render_record(record: &ResultRecord, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(record.trace_line()),
        OutputFormat::Json => serde_json::to_string(record),
    }
}

pub fn render_summary(report: &RunReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(summary_text(report)),
        OutputFormat::Json => summary_json(report),
    }
}

fn summary_text(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut text = String::new();
    let mut line = |key: &str, value: String| {
        let _ = writeln!(text, "{key}={value}");
    };

    line("total_urls", summary.total_urls.to_string());
    for bucket in Bucket::ALL {
        line(
            &format!("bucket.{}", bucket.label()),
            summary.buckets.get(bucket).to_string(),
        );
    }
    for (classification, count) in summary.statuses_by_count() {
        line(&format!("status.{classification}"), count.to_string());
    }
    line("avg_duration_ms", optional(summary.avg_duration_ms));
    line("median_duration_ms", optional(summary.median_duration_ms));
    line("min_duration_ms", optional_count(summary.min_duration_ms));
    line("max_duration_ms", optional_count(summary.max_duration_ms));
    line(
        "throughput_2xx_per_sec",
        format!("{:.2}", summary.throughput_2xx_per_sec),
    );
    line("avg_body_length_2xx", optional(summary.avg_body_len_2xx));
    line("success_ratio", optional(summary.success_ratio));
    line("wall_clock_secs", format!("{:.3}", summary.wall_clock_secs));
    line("limiter.capacity", report.limiter.capacity.to_string());
    line("limiter.acquired", report.limiter.acquired.to_string());
    line("limiter.released", report.limiter.released.to_string());
    line("limiter.peak_active", report.limiter.peak_active.to_string());
    text
}

fn summary_json(report: &RunReport) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(&report.summary)?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "limiter".to_string(),
            json!({
                "capacity": report.limiter.capacity,
                "acquired": report.limiter.acquired,
                "released": report.limiter.released,
                "peak_active": report.limiter.peak_active,
            }),
        );
    }
    serde_json::to_string(&value)
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn optional_count(value: Option<u64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}
