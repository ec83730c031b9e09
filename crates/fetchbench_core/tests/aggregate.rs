use std::sync::Once;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fetchbench_core::{
    fold, AggregateState, Bucket, ErrorKind, Outcome, ResultRecord, Summary, UrlTask,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

fn record(seq: u64, outcome: Outcome, duration_ms: u64) -> ResultRecord {
    let task = UrlTask::new(format!("http://host{seq}.example/"), seq);
    ResultRecord::new(&task, outcome, t0(), duration_ms, 0)
}

fn ok(status: u16, body_len: u64) -> Outcome {
    Outcome::Success { status, body_len }
}

fn run(records: &[ResultRecord], wall_clock: Duration) -> Summary {
    let state = records
        .iter()
        .fold(AggregateState::new(t0()), |state, record| fold(state, record));
    state.finalize(t0() + wall_clock)
}

#[test]
fn empty_run_reports_defined_values() {
    init_logging();
    let summary = run(&[], Duration::zero());

    assert_eq!(summary.total_urls, 0);
    assert_eq!(summary.buckets.total(), 0);
    assert_eq!(summary.avg_duration_ms, None);
    assert_eq!(summary.median_duration_ms, None);
    assert_eq!(summary.max_duration_ms, None);
    assert_eq!(summary.avg_body_len_2xx, None);
    assert_eq!(summary.success_ratio, None);
    assert_eq!(summary.throughput_2xx_per_sec, 0.0);
    assert_eq!(summary.wall_clock_secs, 0.0);
}

#[test]
fn mixed_run_buckets_and_rates() {
    init_logging();
    let records = vec![
        record(0, ok(200, 100), 10),
        record(1, Outcome::Failure(ErrorKind::Timeout), 5000),
        record(2, ok(404, 9), 12),
        record(3, ok(201, 300), 30),
        record(4, ok(302, 0), 4),
        record(5, ok(503, 50), 20),
    ];
    let summary = run(&records, Duration::seconds(2));

    assert_eq!(summary.total_urls, 6);
    assert_eq!(summary.buckets.get(Bucket::Success), 2);
    assert_eq!(summary.buckets.get(Bucket::Redirection), 1);
    assert_eq!(summary.buckets.get(Bucket::ClientError), 1);
    assert_eq!(summary.buckets.get(Bucket::ServerError), 1);
    assert_eq!(summary.buckets.get(Bucket::Exception), 1);
    assert_eq!(summary.buckets.total(), summary.total_urls);

    // Only 2xx bodies count toward the average size.
    assert_eq!(summary.avg_body_len_2xx, Some(200.0));
    assert_eq!(summary.success_ratio, Some(2.0 / 6.0));
    assert_eq!(summary.throughput_2xx_per_sec, 1.0);
    assert_eq!(summary.max_duration_ms, Some(5000));
    assert_eq!(summary.min_duration_ms, Some(4));
    assert_eq!(summary.avg_duration_ms, Some(5076.0 / 6.0));
    // Sorted: 4 10 12 20 30 5000
    assert_eq!(summary.median_duration_ms, Some(16.0));

    assert_eq!(summary.statuses.get("Timeout"), Some(&1));
    assert_eq!(summary.statuses.get("200"), Some(&1));
    assert_eq!(summary.statuses.get("201"), Some(&1));
}

#[test]
fn median_of_odd_count_is_middle_value() {
    init_logging();
    let records = vec![
        record(0, ok(200, 1), 50),
        record(1, ok(200, 1), 10),
        record(2, ok(200, 1), 30),
    ];
    let summary = run(&records, Duration::seconds(1));
    assert_eq!(summary.median_duration_ms, Some(30.0));
}

#[test]
fn fold_is_order_independent() {
    init_logging();
    let mut records = vec![
        record(0, ok(200, 10), 7),
        record(1, Outcome::Failure(ErrorKind::ConnectionError), 3),
        record(2, ok(500, 1), 90),
        record(3, ok(200, 20), 15),
        record(4, Outcome::Failure(ErrorKind::TooManyRedirects), 40),
    ];
    let forward = run(&records, Duration::milliseconds(500));
    records.reverse();
    let backward = run(&records, Duration::milliseconds(500));
    records.rotate_left(2);
    let rotated = run(&records, Duration::milliseconds(500));

    assert_eq!(forward, backward);
    assert_eq!(forward, rotated);
}

#[test]
fn no_successes_keeps_body_average_undefined() {
    init_logging();
    let records = vec![
        record(0, Outcome::Failure(ErrorKind::Cancelled), 1),
        record(1, ok(404, 77), 2),
    ];
    let summary = run(&records, Duration::seconds(1));
    assert_eq!(summary.avg_body_len_2xx, None);
    assert_eq!(summary.success_ratio, Some(0.0));
    assert_eq!(summary.throughput_2xx_per_sec, 0.0);
    assert_eq!(summary.avg_duration_ms, Some(1.5));
}

#[test]
fn summary_serializes_bucket_labels() {
    init_logging();
    let summary = run(&[record(0, ok(200, 4), 1)], Duration::seconds(1));
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["buckets"]["2xx"], 1);
    assert_eq!(json["buckets"]["Exception"], 0);
    assert_eq!(json["total_urls"], 1);

    let empty = run(&[], Duration::zero());
    let json = serde_json::to_value(&empty).unwrap();
    assert!(json["median_duration_ms"].is_null());
    assert!(json["success_ratio"].is_null());
}

#[test]
fn all_successes_give_a_full_success_ratio() {
    init_logging();
    let records = vec![record(0, ok(200, 1), 5), record(1, ok(204, 0), 6)];
    let summary = run(&records, Duration::seconds(1));
    assert_eq!(summary.success_ratio, Some(1.0));
}

#[test]
fn histogram_ranks_classifications_by_count() {
    init_logging();
    let records = vec![
        record(0, ok(404, 0), 1),
        record(1, ok(200, 1), 1),
        record(2, Outcome::Failure(ErrorKind::Timeout), 1),
        record(3, ok(200, 1), 1),
        record(4, Outcome::Failure(ErrorKind::Timeout), 1),
        record(5, ok(200, 1), 1),
        record(6, ok(301, 0), 1),
    ];
    let summary = run(&records, Duration::seconds(1));
    assert_eq!(
        summary.statuses_by_count(),
        vec![("200", 3), ("Timeout", 2), ("301", 1), ("404", 1)]
    );
}
