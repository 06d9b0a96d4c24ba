//! The published status document.
//!
//! Field names are the wire contract with the dashboard front end and
//! must stay stable. Every field is always present: absent data shows up
//! as zero, an empty collection, `"N/A"`, `"unknown"` or `null`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::location::BackendKind;
use crate::metrics::{Eta, SpeedMetrics};
use crate::secondary::SecondaryPhaseDetail;
use crate::task::{RouteBacklog, TaskCounts, TaskRecord, WorkerRecord};

/// Coarse state of the observed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Completed,
    NoData,
    Idle,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::NoData => "NO_DATA",
            Self::Idle => "IDLE",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the snapshot was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsEcho {
    pub base_output_dirs: Vec<PathBuf>,
    pub active_output_dir: PathBuf,
    pub active_checkpoint_dir: PathBuf,
    pub active_logs_dir: PathBuf,
    pub backend: BackendKind,
}

/// Run configuration as recorded by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEcho {
    pub run_id: String,
    pub mode: String,
    pub started_at: Option<String>,
    pub routes: Vec<String>,
    pub routes_count: usize,
    pub dates_count: usize,
    pub chunks_count: u32,
    pub ports: Vec<u16>,
    pub ports_count: usize,
    pub oal_workers: u32,
    pub date_range: String,
}

/// Per-phase and blended completion percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub lf: f64,
    pub oal: f64,
    pub oal_is_estimated: bool,
    pub oal_status: String,
    pub oal_current_pass: u32,
    pub oal_total_passes: u32,
    pub oal_routes_completed: u32,
    pub oal_routes_total: u32,
    pub excel: f64,
    pub overall: f64,
    pub run_completed: bool,
}

/// Tail of the newest log file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTail {
    pub lines: Vec<String>,
    pub file: Option<String>,
    pub total_lines: usize,
    pub error: Option<String>,
}

impl LogTail {
    #[must_use]
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// One immutable status document per poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: String,
    pub status: RunStatus,
    pub running: bool,
    pub active_workers: u64,
    pub paths: PathsEcho,
    pub config: ConfigEcho,
    pub progress: PhaseProgress,
    pub tasks: TaskCounts,
    pub workers: BTreeMap<String, WorkerRecord>,
    pub pending_routes: BTreeMap<String, RouteBacklog>,
    pub running_tasks: Vec<TaskRecord>,
    /// Generated output files of this run.
    #[serde(rename = "excel_files")]
    pub artifact_files: Vec<String>,
    #[serde(rename = "excel_count")]
    pub artifact_count: usize,
    pub speed_metrics: SpeedMetrics,
    pub eta: Eta,
    pub oal_details: SecondaryPhaseDetail,
    pub live_logs: LogTail,
    /// External payload passed through untouched.
    #[serde(rename = "flight_booking_data")]
    pub payload: serde_json::Value,
    pub validation: serde_json::Value,
}
