//! Primary-queue task and worker records, and the progress summary
//! derived from them.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one primary-queue task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskState {
    /// Map a stored state label to a task state.
    ///
    /// Matching ignores case. The exhausted-retry sub-state counts as
    /// failed; anything unrecognised counts as pending.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "done" => Self::Done,
            "failed" | "failed_exhausted" => Self::Failed,
            _ => Self::Pending,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One primary-queue task as shown in the running-tasks panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub route: Option<String>,
    pub chunk: Option<i64>,
    pub status: TaskState,
    pub worker: Option<String>,
    pub dates_count: usize,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Whether a worker currently holds a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    #[default]
    Idle,
    Working,
}

/// Status of one configured worker, keyed by port in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub status: WorkerStatus,
    pub active_route: Option<String>,
    pub active_task: Option<String>,
}

impl WorkerRecord {
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn working(route: Option<String>, task_id: impl Into<String>) -> Self {
        Self {
            status: WorkerStatus::Working,
            active_route: route,
            active_task: Some(task_id.into()),
        }
    }
}

/// Task totals by state.
///
/// Built only through [`TaskCounts::add`], so
/// `done + running + pending + failed == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: u64,
    pub done: u64,
    pub running: u64,
    pub pending: u64,
    pub failed: u64,
}

impl TaskCounts {
    /// Count `n` more tasks in `state`.
    pub fn add(&mut self, state: TaskState, n: u64) {
        self.total += n;
        match state {
            TaskState::Pending => self.pending += n,
            TaskState::Running => self.running += n,
            TaskState::Done => self.done += n,
            TaskState::Failed => self.failed += n,
        }
    }

    #[must_use]
    pub fn tally<I: IntoIterator<Item = TaskState>>(states: I) -> Self {
        let mut counts = Self::default();
        for state in states {
            counts.add(state, 1);
        }
        counts
    }

    /// `true` when at least one task exists and every task is done.
    #[must_use]
    pub fn all_done(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

/// Task counts plus completion percent (0-100, one decimal).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    #[serde(flatten)]
    pub counts: TaskCounts,
    pub percent: f64,
}

impl ProgressSummary {
    #[must_use]
    pub fn from_counts(counts: TaskCounts) -> Self {
        Self {
            counts,
            percent: percent_of(counts.done, counts.total),
        }
    }
}

/// `round(part / whole * 100, 1)`, or `0.0` when `whole` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1)
}

/// Round half away from zero to `places` decimals.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Per-route backlog used by the pending-routes panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBacklog {
    pub total_tasks: u64,
    pub done_tasks: u64,
    pub pending_dates: Vec<String>,
    pub done_dates: Vec<String>,
}

impl RouteBacklog {
    /// Fold one task of this route into the backlog.
    pub fn record(&mut self, state: TaskState, dates: impl IntoIterator<Item = String>) {
        self.total_tasks += 1;
        if state == TaskState::Done {
            self.done_tasks += 1;
            self.done_dates.extend(dates);
        } else {
            self.pending_dates.extend(dates);
        }
    }
}

/// Grouping key for tasks without a route.
pub const UNKNOWN_ROUTE: &str = "unknown";
