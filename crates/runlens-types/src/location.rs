//! Resolved checkpoint location and the artifact layout beneath it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lenient::lenient;

pub const CHECKPOINTS_DIR: &str = "checkpoints";
pub const LOGS_DIR: &str = "logs";

pub const RUN_STATE_FILE: &str = "run_state.json";
pub const TASKS_STATE_FILE: &str = "tasks_state.json";
pub const SQLITE_STATE_DB: &str = "chunk_state.db";
pub const SECONDARY_STATE_FILE: &str = "oal_state.json";
pub const PAYLOAD_FILE: &str = "flight_booking_data.json";
pub const HEARTBEAT_FILE: &str = "worker_heartbeats.json";
pub const VALIDATION_FILE: &str = "validation_warnings.json";

/// Artifacts whose modification time indicates real work.
///
/// The run-state file is absent on purpose: the pipeline touches it
/// without doing any extraction.
pub const ACTIVITY_ARTIFACTS: [&str; 5] = [
    SQLITE_STATE_DB,
    SECONDARY_STATE_FILE,
    PAYLOAD_FILE,
    HEARTBEAT_FILE,
    TASKS_STATE_FILE,
];

/// Which checkpoint storage backend the producing pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Flat JSON documents.
    Json,
    /// Embedded `SQLite` database.
    Sqlite,
}

impl BackendKind {
    /// Label carried in the snapshot.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pointer artifact written by the producing pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PointerArtifact {
    #[serde(default, deserialize_with = "lenient")]
    pub active_output_dir: Option<PathBuf>,
}

/// Directories of the currently active run.
///
/// Locations are never persisted; they are re-derived from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointLocation {
    pub output_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub backend: BackendKind,
}

impl CheckpointLocation {
    /// Location rooted at a run's output directory.
    #[must_use]
    pub fn for_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        let checkpoint_dir = output_dir.join(CHECKPOINTS_DIR);
        Self::build(output_dir, checkpoint_dir)
    }

    /// Location derived from a checkpoint directory; its parent is taken
    /// as the output directory.
    #[must_use]
    pub fn for_checkpoint_dir(checkpoint_dir: impl Into<PathBuf>) -> Self {
        let checkpoint_dir = checkpoint_dir.into();
        let output_dir = checkpoint_dir
            .parent()
            .map_or_else(|| checkpoint_dir.clone(), Path::to_path_buf);
        Self::build(output_dir, checkpoint_dir)
    }

    fn build(output_dir: PathBuf, checkpoint_dir: PathBuf) -> Self {
        let logs_dir = output_dir.join(LOGS_DIR);
        let mut location = Self {
            output_dir,
            checkpoint_dir,
            logs_dir,
            backend: BackendKind::Json,
        };
        location.refresh_backend();
        location
    }

    /// Backend selected by the database file's presence.
    #[must_use]
    pub fn detect_backend(&self) -> BackendKind {
        if self.sqlite_db_path().is_file() {
            BackendKind::Sqlite
        } else {
            BackendKind::Json
        }
    }

    /// Re-run backend detection and store the result.
    pub fn refresh_backend(&mut self) {
        self.backend = self.detect_backend();
    }

    #[must_use]
    pub fn artifact(&self, name: &str) -> PathBuf {
        self.checkpoint_dir.join(name)
    }

    #[must_use]
    pub fn run_state_path(&self) -> PathBuf {
        self.artifact(RUN_STATE_FILE)
    }

    #[must_use]
    pub fn tasks_state_path(&self) -> PathBuf {
        self.artifact(TASKS_STATE_FILE)
    }

    #[must_use]
    pub fn sqlite_db_path(&self) -> PathBuf {
        self.artifact(SQLITE_STATE_DB)
    }

    #[must_use]
    pub fn secondary_state_path(&self) -> PathBuf {
        self.artifact(SECONDARY_STATE_FILE)
    }

    #[must_use]
    pub fn payload_path(&self) -> PathBuf {
        self.artifact(PAYLOAD_FILE)
    }

    #[must_use]
    pub fn validation_path(&self) -> PathBuf {
        self.artifact(VALIDATION_FILE)
    }

    /// Paths of the work-indicating artifacts, see [`ACTIVITY_ARTIFACTS`].
    #[must_use]
    pub fn activity_paths(&self) -> Vec<PathBuf> {
        ACTIVITY_ARTIFACTS
            .iter()
            .map(|name| self.artifact(name))
            .collect()
    }
}
