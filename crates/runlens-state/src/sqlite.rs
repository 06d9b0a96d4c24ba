//! `SQLite`-backed implementation of [`CheckpointBackend`].
//!
//! Opens a short-lived read-only connection with a busy timeout. The
//! backend is meant to live for a single poll so no handle is ever held
//! across polls while the pipeline's writer needs its lock.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use runlens_types::location::BackendKind;
use runlens_types::task::{
    ProgressSummary, RouteBacklog, TaskCounts, TaskRecord, TaskState, WorkerRecord, UNKNOWN_ROUTE,
};
use runlens_types::time::{format_local, from_epoch_secs, parse_timestamp, to_epoch_secs};

use crate::backend::{idle_workers, worker_port, CheckpointBackend};
use crate::error;

/// Lease length the pipeline grants a worker per task.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(900);

const TASK_COUNTS_SQL: &str = "SELECT state, COUNT(*) FROM chunk_tasks GROUP BY state";

const RUNNING_TASKS_SQL: &str = "\
SELECT task_id, route, chunk_idx, state, worker_id, dates, lease_expires_at, updated_at \
FROM chunk_tasks \
WHERE state = 'running' \
ORDER BY updated_at DESC";

const WORKER_HEARTBEATS_SQL: &str = "\
SELECT w.worker_id, w.status, w.task_id, t.route \
FROM worker_heartbeats w \
LEFT JOIN chunk_tasks t ON w.task_id = t.task_id";

const ROUTE_BACKLOG_SQL: &str = "SELECT route, state, dates FROM chunk_tasks";

const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1";

/// Read-only view of the pipeline's `chunk_state.db`.
pub struct SqliteCheckpointBackend {
    conn: Connection,
    lease_duration: Duration,
}

impl SqliteCheckpointBackend {
    /// Open the database read-only, waiting at most `busy_timeout` for
    /// the writer's lock on each statement.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Sqlite`](crate::error::ReadError::Sqlite) if
    /// the file cannot be opened as a database.
    pub fn open(
        path: &Path,
        busy_timeout: Duration,
        lease_duration: Duration,
    ) -> error::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self {
            conn,
            lease_duration,
        })
    }

    fn table_exists(&self, name: &str) -> error::Result<bool> {
        let count: i64 = self
            .conn
            .query_row(TABLE_EXISTS_SQL, [name], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Start time of a running task: lease expiry minus the lease
    /// length, else the last update, else now.
    fn reconstruct_started_at(&self, lease_expires_at: Option<f64>, updated_at: Option<f64>) -> String {
        let started = lease_expires_at
            .map(|expiry| expiry - self.lease_duration.as_secs_f64())
            .or(updated_at)
            .and_then(from_epoch_secs)
            .unwrap_or_else(Utc::now);
        format_local(started)
    }
}

impl CheckpointBackend for SqliteCheckpointBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    #[allow(clippy::cast_sign_loss)]
    fn progress_summary(&self) -> error::Result<ProgressSummary> {
        let mut stmt = self.conn.prepare(TASK_COUNTS_SQL)?;
        let rows = stmt.query_map([], |row| {
            let state = text_column(row, 0)?;
            let count: i64 = row.get(1)?;
            Ok((state, count))
        })?;

        let mut counts = TaskCounts::default();
        for row in rows {
            let (state, count) = row?;
            let state = state.as_deref().map_or(TaskState::Pending, TaskState::from_label);
            counts.add(state, count.max(0) as u64);
        }
        Ok(ProgressSummary::from_counts(counts))
    }

    /// Running tasks only, most recently updated first.
    fn task_detail(&self) -> error::Result<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(RUNNING_TASKS_SQL)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                text_column(row, 0)?.unwrap_or_default(),
                text_column(row, 1)?,
                row.get::<_, Option<i64>>(2).ok().flatten(),
                text_column(row, 3)?,
                text_column(row, 4)?,
                text_column(row, 5)?,
                epoch_column(row, 6)?,
                epoch_column(row, 7)?,
            ))
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, route, chunk, state, worker, dates, lease_expires_at, updated_at) = row?;
            tasks.push(TaskRecord {
                id,
                route,
                chunk,
                status: state.as_deref().map_or(TaskState::Pending, TaskState::from_label),
                worker,
                dates_count: parse_dates(dates.as_deref()).len(),
                started_at: Some(self.reconstruct_started_at(lease_expires_at, updated_at)),
                completed_at: None,
            });
        }
        Ok(tasks)
    }

    fn worker_status(&self, ports: &[u16]) -> error::Result<BTreeMap<String, WorkerRecord>> {
        let mut workers = idle_workers(ports);
        if !self.table_exists("worker_heartbeats")? {
            tracing::debug!("No worker_heartbeats table yet, reporting all workers idle");
            return Ok(workers);
        }

        let mut stmt = self.conn.prepare(WORKER_HEARTBEATS_SQL)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                text_column(row, 0)?.unwrap_or_default(),
                text_column(row, 1)?.unwrap_or_default(),
                text_column(row, 2)?.filter(|id| !id.is_empty()),
                text_column(row, 3)?,
            ))
        })?;

        for row in rows {
            let (worker_id, status, task_id, route) = row?;
            let Some(port) = worker_port(&worker_id) else {
                continue;
            };
            let Some(slot) = workers.get_mut(port) else {
                continue;
            };
            *slot = match task_id {
                Some(task_id) if status.eq_ignore_ascii_case("running") => {
                    WorkerRecord::working(route, task_id)
                }
                _ => WorkerRecord::idle(),
            };
        }
        Ok(workers)
    }

    fn pending_routes(&self) -> error::Result<BTreeMap<String, RouteBacklog>> {
        let mut stmt = self.conn.prepare(ROUTE_BACKLOG_SQL)?;
        let rows = stmt.query_map([], |row| {
            Ok((text_column(row, 0)?, text_column(row, 1)?, text_column(row, 2)?))
        })?;

        let mut routes: BTreeMap<String, RouteBacklog> = BTreeMap::new();
        for row in rows {
            let (route, state, dates) = row?;
            let state = state.as_deref().map_or(TaskState::Pending, TaskState::from_label);
            routes
                .entry(route.unwrap_or_else(|| UNKNOWN_ROUTE.to_string()))
                .or_default()
                .record(state, parse_dates(dates.as_deref()));
        }
        Ok(routes)
    }
}

/// A column rendered as text whatever its storage class.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

/// A timestamp column as epoch seconds. Accepts numeric storage and
/// text holding either a number or an ISO-8601 string.
#[allow(clippy::cast_precision_loss)]
fn epoch_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => {
            let text = String::from_utf8_lossy(t);
            text.trim()
                .parse::<f64>()
                .ok()
                .or_else(|| parse_timestamp(&text).map(to_epoch_secs))
        }
    }
    .filter(|secs| *secs > 0.0))
}

/// The JSON-encoded `dates` column; anything unparseable is empty.
fn parse_dates(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}
