//! Checkpoint backend capability trait.
//!
//! [`CheckpointBackend`] is the read contract both storage flavours
//! satisfy, so callers stay backend-agnostic apart from the
//! [`BackendKind`] label.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use runlens_types::location::BackendKind;
use runlens_types::task::{ProgressSummary, RouteBacklog, TaskRecord, WorkerRecord};

use crate::error;

static WORKER_PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Worker_(\d+)").expect("valid worker id regex"));

/// Read contract for one checkpoint store.
pub trait CheckpointBackend {
    fn kind(&self) -> BackendKind;

    /// Task totals by state with completion percent.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`](crate::error::ReadError) on storage failure.
    fn progress_summary(&self) -> error::Result<ProgressSummary>;

    /// Task detail rows. Implementations may restrict this to running
    /// tasks; callers filter by state before display.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`](crate::error::ReadError) on storage failure.
    fn task_detail(&self) -> error::Result<Vec<TaskRecord>>;

    /// Status of each configured worker port, keyed by the port string.
    /// Ports that report nothing are idle.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`](crate::error::ReadError) on storage failure.
    fn worker_status(&self, ports: &[u16]) -> error::Result<BTreeMap<String, WorkerRecord>>;

    /// Per-route task and date backlog.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`](crate::error::ReadError) on storage failure.
    fn pending_routes(&self) -> error::Result<BTreeMap<String, RouteBacklog>>;
}

/// Port embedded in a worker identity such as `"Worker_9222"`.
#[must_use]
pub fn worker_port(worker_id: &str) -> Option<&str> {
    WORKER_PORT_RE
        .captures(worker_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Every configured port marked idle.
#[must_use]
pub fn idle_workers(ports: &[u16]) -> BTreeMap<String, WorkerRecord> {
    ports
        .iter()
        .map(|port| (port.to_string(), WorkerRecord::idle()))
        .collect()
}
