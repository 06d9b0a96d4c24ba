//! JSON-file checkpoint backend.
//!
//! The pipeline keeps a single `tasks_state.json` map keyed by task id.
//! The map is loaded once at construction; a missing or corrupt file
//! yields an empty task set.

use std::collections::BTreeMap;
use std::path::Path;

use runlens_types::lenient::lenient;
use runlens_types::location::BackendKind;
use runlens_types::task::{
    ProgressSummary, RouteBacklog, TaskCounts, TaskRecord, TaskState, WorkerRecord, UNKNOWN_ROUTE,
};
use serde::Deserialize;
use serde_json::Value;

use crate::artifacts::load_document;
use crate::backend::{idle_workers, worker_port, CheckpointBackend};
use crate::error;

/// One entry of the task map as written by the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
struct JsonTask {
    #[serde(default, deserialize_with = "lenient")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    route: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    chunk_idx: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    assigned_worker: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    dates: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    started_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    completed_at: Option<String>,
}

impl JsonTask {
    fn state(&self) -> TaskState {
        self.status.as_deref().map_or(TaskState::Pending, TaskState::from_label)
    }
}

/// Task map backed by `tasks_state.json`, ordered by task id.
#[derive(Debug, Default)]
pub struct JsonCheckpointBackend {
    tasks: BTreeMap<String, JsonTask>,
}

impl JsonCheckpointBackend {
    /// Load the task map. Entries that are not objects count as pending
    /// tasks with no detail.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let raw: BTreeMap<String, Value> = load_document(path, "tasks_state").unwrap_or_default();
        let tasks = raw
            .into_iter()
            .map(|(id, value)| (id, JsonTask::deserialize(value).unwrap_or_default()))
            .collect();
        Self { tasks }
    }
}

impl CheckpointBackend for JsonCheckpointBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Json
    }

    fn progress_summary(&self) -> error::Result<ProgressSummary> {
        let counts = TaskCounts::tally(self.tasks.values().map(JsonTask::state));
        Ok(ProgressSummary::from_counts(counts))
    }

    fn task_detail(&self) -> error::Result<Vec<TaskRecord>> {
        Ok(self
            .tasks
            .iter()
            .map(|(id, task)| TaskRecord {
                id: id.clone(),
                route: task.route.clone(),
                chunk: task.chunk_idx,
                status: task.state(),
                worker: task.assigned_worker.clone(),
                dates_count: task.dates.len(),
                started_at: task.started_at.clone(),
                completed_at: task.completed_at.clone(),
            })
            .collect())
    }

    fn worker_status(&self, ports: &[u16]) -> error::Result<BTreeMap<String, WorkerRecord>> {
        let mut workers = idle_workers(ports);
        for (id, task) in &self.tasks {
            if task.state() != TaskState::Running {
                continue;
            }
            let Some(port) = task.assigned_worker.as_deref().and_then(worker_port) else {
                continue;
            };
            if let Some(slot) = workers.get_mut(port) {
                *slot = WorkerRecord::working(task.route.clone(), id.clone());
            }
        }
        Ok(workers)
    }

    fn pending_routes(&self) -> error::Result<BTreeMap<String, RouteBacklog>> {
        let mut routes: BTreeMap<String, RouteBacklog> = BTreeMap::new();
        for task in self.tasks.values() {
            let route = task.route.clone().unwrap_or_else(|| UNKNOWN_ROUTE.to_string());
            routes
                .entry(route)
                .or_default()
                .record(task.state(), task.dates.iter().cloned());
        }
        Ok(routes)
    }
}
