//! Count and percent properties over arbitrary task sets, for both
//! backends.

use proptest::prelude::*;
use rusqlite::Connection;
use runlens_state::{CheckpointBackend, JsonCheckpointBackend, SqliteCheckpointBackend};
use runlens_state::sqlite::DEFAULT_LEASE_DURATION;
use runlens_types::task::{percent_of, ProgressSummary};
use std::time::Duration;

fn state_label() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "pending",
        "running",
        "done",
        "failed",
        "failed_exhausted",
        "DONE",
        "RUNNING",
        "weird",
        "",
    ])
}

fn check(summary: &ProgressSummary, expected_total: u64, expected_done: u64) {
    let c = summary.counts;
    assert_eq!(c.done + c.running + c.pending + c.failed, c.total);
    assert_eq!(c.total, expected_total);
    assert_eq!(c.done, expected_done);
    assert!((summary.percent - percent_of(c.done, c.total)).abs() < f64::EPSILON);
    if c.total == 0 {
        assert!(summary.percent.abs() < f64::EPSILON);
    } else {
        #[allow(clippy::cast_precision_loss)]
        let raw = c.done as f64 / c.total as f64 * 100.0;
        assert!((summary.percent - raw).abs() <= 0.05 + 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn json_backend_counts_partition_total(labels in prop::collection::vec(state_label(), 0..40)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks_state.json");
        let map: serde_json::Map<String, serde_json::Value> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (format!("t{i:03}"), serde_json::json!({ "status": label })))
            .collect();
        std::fs::write(&path, serde_json::Value::Object(map).to_string()).unwrap();

        let done = labels.iter().filter(|l| l.eq_ignore_ascii_case("done")).count() as u64;
        let summary = JsonCheckpointBackend::load(&path).progress_summary().unwrap();
        check(&summary, labels.len() as u64, done);
    }

    #[test]
    fn sqlite_backend_counts_partition_total(labels in prop::collection::vec(state_label(), 0..40)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_state.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE chunk_tasks (task_id TEXT PRIMARY KEY, state TEXT);").unwrap();
        for (i, label) in labels.iter().enumerate() {
            conn.execute(
                "INSERT INTO chunk_tasks (task_id, state) VALUES (?1, ?2)",
                rusqlite::params![format!("t{i:03}"), label],
            )
            .unwrap();
        }
        drop(conn);

        let done = labels.iter().filter(|l| l.eq_ignore_ascii_case("done")).count() as u64;
        let backend = SqliteCheckpointBackend::open(
            &path,
            Duration::from_millis(200),
            DEFAULT_LEASE_DURATION,
        )
        .unwrap();
        check(&backend.progress_summary().unwrap(), labels.len() as u64, done);
    }
}
