//! Per-poll fallback from the SQLite backend to the JSON backend.
//!
//! A second connection holds an exclusive lock to stand in for the
//! pipeline's writer.

use std::time::Duration;

use rusqlite::Connection;
use runlens_state::{read_checkpoint, ReaderOptions};
use runlens_types::location::{BackendKind, CheckpointLocation};

fn options() -> ReaderOptions {
    ReaderOptions {
        busy_timeout: Duration::from_millis(50),
        ..ReaderOptions::default()
    }
}

fn seed(location: &CheckpointLocation) {
    std::fs::create_dir_all(&location.checkpoint_dir).unwrap();
    let conn = Connection::open(location.sqlite_db_path()).unwrap();
    conn.execute_batch(
        r#"
CREATE TABLE chunk_tasks (task_id TEXT PRIMARY KEY, route TEXT, chunk_idx INTEGER, state TEXT,
                          worker_id TEXT, dates TEXT, lease_expires_at REAL, updated_at REAL);
CREATE TABLE worker_heartbeats (worker_id TEXT PRIMARY KEY, status TEXT, task_id TEXT);
INSERT INTO chunk_tasks VALUES ('r_0', 'CAI-JED', 0, 'done', NULL, '[]', NULL, 1700000000);
INSERT INTO chunk_tasks VALUES ('r_1', 'CAI-JED', 1, 'done', NULL, '[]', NULL, 1700000000);
INSERT INTO chunk_tasks VALUES ('r_2', 'CAI-JED', 2, 'running', 'Worker_9222', '[]', 1700000900, 1700000100);
INSERT INTO worker_heartbeats VALUES ('Worker_9222', 'RUNNING', 'r_2');
"#,
    )
    .unwrap();

    // The JSON copy lags behind the database, which makes the serving
    // backend visible in the counts.
    std::fs::write(
        location.tasks_state_path(),
        r#"{"r_0": {"status": "DONE", "route": "CAI-JED"}}"#,
    )
    .unwrap();
}

#[test]
fn locked_database_falls_back_for_one_poll_only() {
    let dir = tempfile::tempdir().unwrap();
    let location = CheckpointLocation::for_output_dir(dir.path());
    seed(&location);

    let first = read_checkpoint(&location, &[9222], &options());
    assert_eq!(first.backend, BackendKind::Sqlite);
    assert_eq!(first.progress.counts.total, 3);

    let writer = Connection::open(location.sqlite_db_path()).unwrap();
    writer.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let locked = read_checkpoint(&location, &[9222], &options());
    assert_eq!(locked.backend, BackendKind::Json);
    assert_eq!(locked.progress.counts.total, 1);
    assert_eq!(locked.progress.counts.done, 1);

    writer.execute_batch("COMMIT;").unwrap();
    drop(writer);

    let recovered = read_checkpoint(&location, &[9222], &options());
    assert_eq!(recovered.backend, BackendKind::Sqlite);
    assert_eq!(recovered.progress.counts.total, 3);
    assert_eq!(recovered.tasks.len(), 1);
    assert_eq!(
        recovered.workers["9222"].active_task.as_deref(),
        Some("r_2")
    );
}

#[test]
fn removing_the_database_switches_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let location = CheckpointLocation::for_output_dir(dir.path());
    seed(&location);
    assert_eq!(
        read_checkpoint(&location, &[], &options()).backend,
        BackendKind::Sqlite
    );

    std::fs::remove_file(location.sqlite_db_path()).unwrap();
    let read = read_checkpoint(&location, &[], &options());
    assert_eq!(read.backend, BackendKind::Json);
    assert_eq!(read.progress.counts.total, 1);
}
