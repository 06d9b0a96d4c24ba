//! Per-poll backend selection.
//!
//! The database file's presence selects the `SQLite` backend. Any error on
//! that path (busy writer, lock timeout, missing table, corrupt file)
//! drops this poll back to the JSON backend; the next poll checks again.

use std::collections::BTreeMap;
use std::time::Duration;

use runlens_types::location::{BackendKind, CheckpointLocation};
use runlens_types::task::{ProgressSummary, RouteBacklog, TaskRecord, WorkerRecord};

use crate::backend::{idle_workers, CheckpointBackend};
use crate::error;
use crate::json::JsonCheckpointBackend;
use crate::sqlite::{SqliteCheckpointBackend, DEFAULT_LEASE_DURATION};

/// Tuning for the database path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Longest wait for the writer's lock before falling back.
    pub busy_timeout: Duration,
    /// Lease length used to reconstruct running-task start times.
    pub lease_duration: Duration,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(1_000),
            lease_duration: DEFAULT_LEASE_DURATION,
        }
    }
}

/// Everything one poll reads from the task store.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRead {
    /// Backend that actually served this read.
    pub backend: BackendKind,
    pub progress: ProgressSummary,
    pub tasks: Vec<TaskRecord>,
    pub workers: BTreeMap<String, WorkerRecord>,
    pub pending_routes: BTreeMap<String, RouteBacklog>,
}

impl CheckpointRead {
    /// An empty read with every configured worker idle.
    #[must_use]
    pub fn empty(backend: BackendKind, ports: &[u16]) -> Self {
        Self {
            backend,
            progress: ProgressSummary::default(),
            tasks: Vec::new(),
            workers: idle_workers(ports),
            pending_routes: BTreeMap::new(),
        }
    }

    /// Collect all views from one backend.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReadError`](crate::error::ReadError) any view
    /// produces.
    pub fn collect(backend: &dyn CheckpointBackend, ports: &[u16]) -> error::Result<Self> {
        Ok(Self {
            backend: backend.kind(),
            progress: backend.progress_summary()?,
            tasks: backend.task_detail()?,
            workers: backend.worker_status(ports)?,
            pending_routes: backend.pending_routes()?,
        })
    }
}

/// Read the task store at `location`, never failing.
#[must_use]
pub fn read_checkpoint(
    location: &CheckpointLocation,
    ports: &[u16],
    options: &ReaderOptions,
) -> CheckpointRead {
    if location.detect_backend() == BackendKind::Sqlite {
        let db_path = location.sqlite_db_path();
        let result = SqliteCheckpointBackend::open(
            &db_path,
            options.busy_timeout,
            options.lease_duration,
        )
        .and_then(|backend| CheckpointRead::collect(&backend, ports));
        match result {
            Ok(read) => return read,
            Err(e) => {
                tracing::warn!(
                    path = %db_path.display(),
                    error = %e,
                    busy = e.is_backend_unavailable(),
                    "SQLite checkpoint read failed, falling back to JSON for this poll"
                );
            }
        }
    }

    let backend = JsonCheckpointBackend::load(&location.tasks_state_path());
    CheckpointRead::collect(&backend, ports).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "JSON checkpoint read failed");
        CheckpointRead::empty(BackendKind::Json, ports)
    })
}
