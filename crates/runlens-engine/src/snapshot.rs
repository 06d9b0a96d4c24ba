//! Composition of one poll's readings into a [`StatusSnapshot`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use runlens_state::CheckpointRead;
use runlens_types::location::CheckpointLocation;
use runlens_types::metrics::{Eta, SpeedMetrics};
use runlens_types::run::RunIdentity;
use runlens_types::secondary::{SecondaryPhaseDetail, SecondaryPhaseState};
use runlens_types::snapshot::{
    ConfigEcho, LogTail, PathsEcho, PhaseProgress, RunStatus, StatusSnapshot,
};
use runlens_types::task::{round_to, TaskCounts, TaskState};
use runlens_types::time::format_local;
use serde_json::{json, Value};

const PRIMARY_WEIGHT: f64 = 0.5;
const SECONDARY_WEIGHT: f64 = 0.35;
const PRIMARY_WEIGHT_ALONE: f64 = 0.85;
const ARTIFACT_WEIGHT: f64 = 0.15;

const STATUS_DISABLED: &str = "disabled";
const STATUS_WAITING: &str = "waiting";
const STATUS_PENDING: &str = "pending";

/// Everything read during one poll.
#[derive(Debug, Clone)]
pub struct SnapshotInputs {
    pub timestamp: DateTime<Utc>,
    pub location: CheckpointLocation,
    pub base_dirs: Vec<PathBuf>,
    pub identity: Option<RunIdentity>,
    /// Worker ports in effect for this run.
    pub ports: Vec<u16>,
    pub read: CheckpointRead,
    pub secondary_state: Option<SecondaryPhaseState>,
    pub artifact_files: Vec<String>,
    pub expected_artifacts: u32,
    pub speed: SpeedMetrics,
    pub eta: Eta,
    pub logs: LogTail,
    pub payload: Option<Value>,
    pub validation: Option<Value>,
}

/// Secondary-phase percent together with its published detail.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryProgress {
    pub percent: f64,
    pub detail: SecondaryPhaseDetail,
}

impl SecondaryProgress {
    fn disabled() -> Self {
        Self {
            percent: 0.0,
            detail: SecondaryPhaseDetail {
                current_pass: 0,
                total_passes: 0,
                routes_completed_in_pass: 0,
                routes_total_per_pass: 0,
                is_estimated: false,
                status: STATUS_DISABLED.to_string(),
            },
        }
    }
}

/// Secondary-phase progress, estimated from the run identity when the
/// phase has not written its state document yet.
#[must_use]
pub fn secondary_progress(
    identity: &RunIdentity,
    state: Option<&SecondaryPhaseState>,
    counts: &TaskCounts,
) -> SecondaryProgress {
    if !identity.secondary_enabled() {
        return SecondaryProgress::disabled();
    }

    if let Some(state) = state {
        let percent = if state.is_completed() {
            100.0
        } else {
            state.percent.clamp(0.0, 100.0)
        };
        return SecondaryProgress {
            percent,
            detail: SecondaryPhaseDetail {
                current_pass: state.current_pass,
                total_passes: state.total_passes(),
                routes_completed_in_pass: state.routes_completed_in_pass,
                routes_total_per_pass: state.routes_total_per_pass,
                is_estimated: false,
                status: state.status().to_string(),
            },
        };
    }

    let (percent, status) = if identity.is_completed() {
        (100.0, runlens_types::secondary::STATUS_COMPLETED)
    } else if counts.all_done() {
        (0.0, STATUS_WAITING)
    } else {
        (0.0, STATUS_PENDING)
    };
    SecondaryProgress {
        percent,
        detail: SecondaryPhaseDetail {
            current_pass: 0,
            total_passes: identity.secondary_passes(),
            routes_completed_in_pass: 0,
            routes_total_per_pass: u32::try_from(identity.routes.len()).unwrap_or(u32::MAX),
            is_estimated: true,
            status: status.to_string(),
        },
    }
}

/// Observed generated outputs against the expected count, 0-100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn artifact_completeness(count: usize, expected: u32, run_completed: bool) -> f64 {
    if run_completed && count > 0 {
        return 100.0;
    }
    if expected == 0 {
        return 0.0;
    }
    (count as f64 / f64::from(expected) * 100.0).min(100.0)
}

/// Weighted blend of the phase percentages.
///
/// `secondary` is `None` when the phase is disabled. Once every enabled
/// phase has reached its own completion condition the result is exactly
/// 100 regardless of the artifact share.
#[must_use]
pub fn overall_percent(
    primary: f64,
    primary_complete: bool,
    secondary: Option<(f64, bool)>,
    artifacts: f64,
) -> f64 {
    match secondary {
        None if primary_complete => 100.0,
        Some((_, true)) if primary_complete => 100.0,
        None => round_to(primary * PRIMARY_WEIGHT_ALONE + artifacts * ARTIFACT_WEIGHT, 1),
        Some((pct, _)) => round_to(
            primary * PRIMARY_WEIGHT + pct * SECONDARY_WEIGHT + artifacts * ARTIFACT_WEIGHT,
            1,
        ),
    }
}

#[must_use]
pub fn run_status(counts: &TaskCounts) -> RunStatus {
    if counts.running > 0 {
        RunStatus::Running
    } else if counts.all_done() {
        RunStatus::Completed
    } else if counts.total == 0 {
        RunStatus::NoData
    } else {
        RunStatus::Idle
    }
}

#[must_use]
pub fn default_payload() -> Value {
    json!({"flights": [], "updated_at": null})
}

#[must_use]
pub fn default_validation() -> Value {
    json!({"passed": true, "warnings": []})
}

fn config_echo(identity: &RunIdentity, ports: Vec<u16>) -> ConfigEcho {
    ConfigEcho {
        run_id: identity.run_id().to_string(),
        mode: identity.mode().to_string(),
        started_at: identity.started_at.clone(),
        routes: identity.routes.clone(),
        routes_count: identity.routes.len(),
        dates_count: identity.dates.len(),
        chunks_count: identity.chunks_count,
        ports_count: ports.len(),
        ports,
        oal_workers: identity.oal_workers,
        date_range: identity.date_range(),
    }
}

/// Build the snapshot; pure apart from formatting the timestamp in local
/// time.
#[must_use]
pub fn assemble(inputs: SnapshotInputs) -> StatusSnapshot {
    let SnapshotInputs {
        timestamp,
        location,
        base_dirs,
        identity,
        ports,
        read,
        secondary_state,
        artifact_files,
        expected_artifacts,
        speed,
        eta,
        logs,
        payload,
        validation,
    } = inputs;

    let identity = identity.unwrap_or_default();
    let counts = read.progress.counts;
    let run_completed = identity.is_completed();

    let primary = read.progress.percent;
    let secondary = secondary_progress(&identity, secondary_state.as_ref(), &counts);
    let artifacts = artifact_completeness(artifact_files.len(), expected_artifacts, run_completed);
    let overall = overall_percent(
        primary,
        counts.all_done(),
        identity
            .secondary_enabled()
            .then_some((secondary.percent, secondary.percent >= 100.0)),
        artifacts,
    );

    let running_tasks = read
        .tasks
        .into_iter()
        .filter(|t| t.status == TaskState::Running)
        .collect();

    StatusSnapshot {
        timestamp: format_local(timestamp),
        status: run_status(&counts),
        running: counts.running > 0,
        active_workers: counts.running,
        paths: PathsEcho {
            base_output_dirs: base_dirs,
            active_output_dir: location.output_dir,
            active_checkpoint_dir: location.checkpoint_dir,
            active_logs_dir: location.logs_dir,
            backend: read.backend,
        },
        config: config_echo(&identity, ports),
        progress: PhaseProgress {
            lf: primary,
            oal: round_to(secondary.percent, 1),
            oal_is_estimated: secondary.detail.is_estimated,
            oal_status: secondary.detail.status.clone(),
            oal_current_pass: secondary.detail.current_pass,
            oal_total_passes: secondary.detail.total_passes,
            oal_routes_completed: secondary.detail.routes_completed_in_pass,
            oal_routes_total: secondary.detail.routes_total_per_pass,
            excel: round_to(artifacts, 1),
            overall,
            run_completed,
        },
        tasks: counts,
        workers: read.workers,
        pending_routes: read.pending_routes,
        running_tasks,
        artifact_count: artifact_files.len(),
        artifact_files,
        speed_metrics: speed,
        eta,
        oal_details: secondary.detail,
        live_logs: logs,
        payload: payload.unwrap_or_else(default_payload),
        validation: validation.unwrap_or_else(default_validation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlens_types::location::BackendKind;
    use runlens_types::task::{ProgressSummary, TaskRecord};

    fn counts(total: u64, done: u64, running: u64) -> TaskCounts {
        TaskCounts {
            total,
            done,
            running,
            pending: total - done - running,
            failed: 0,
        }
    }

    fn enabled_identity() -> RunIdentity {
        RunIdentity {
            routes: vec!["AAA-BBB".into(), "CCC-DDD".into(), "EEE-FFF".into()],
            oal_workers: 2,
            oal_passes: Some(3),
            ..RunIdentity::default()
        }
    }

    fn inputs(read: CheckpointRead) -> SnapshotInputs {
        SnapshotInputs {
            timestamp: Utc::now(),
            location: CheckpointLocation::for_output_dir("/nonexistent/run"),
            base_dirs: vec![PathBuf::from("/nonexistent")],
            identity: None,
            ports: vec![9222, 9223, 9224],
            read,
            secondary_state: None,
            artifact_files: Vec::new(),
            expected_artifacts: 4,
            speed: SpeedMetrics::default(),
            eta: Eta::default(),
            logs: LogTail::unavailable("No log files found"),
            payload: None,
            validation: None,
        }
    }

    #[test]
    fn status_derivation() {
        assert_eq!(run_status(&counts(10, 3, 2)), RunStatus::Running);
        assert_eq!(run_status(&counts(10, 10, 0)), RunStatus::Completed);
        assert_eq!(run_status(&counts(0, 0, 0)), RunStatus::NoData);
        assert_eq!(run_status(&counts(10, 3, 0)), RunStatus::Idle);
    }

    #[test]
    fn weighted_blend_with_and_without_secondary() {
        assert!((overall_percent(50.0, false, Some((40.0, false)), 20.0) - 42.0).abs() < 1e-9);
        assert!((overall_percent(50.0, false, None, 20.0) - 45.5).abs() < 1e-9);
    }

    #[test]
    fn completed_phases_force_exactly_100() {
        // The weighted sum alone would stay at 85 with no outputs yet.
        assert!((overall_percent(100.0, true, None, 0.0) - 100.0).abs() < f64::EPSILON);
        assert!(
            (overall_percent(100.0, true, Some((100.0, true)), 0.0) - 100.0).abs() < f64::EPSILON
        );
        assert!(overall_percent(100.0, true, Some((60.0, false)), 0.0) < 100.0);
    }

    #[test]
    fn artifact_completeness_caps_and_completes() {
        assert!((artifact_completeness(2, 4, false) - 50.0).abs() < f64::EPSILON);
        assert!((artifact_completeness(9, 4, false) - 100.0).abs() < f64::EPSILON);
        assert!((artifact_completeness(1, 4, true) - 100.0).abs() < f64::EPSILON);
        assert!(artifact_completeness(0, 4, true).abs() < f64::EPSILON);
    }

    #[test]
    fn secondary_estimated_without_state() {
        let identity = enabled_identity();
        let pending = secondary_progress(&identity, None, &counts(10, 4, 1));
        assert!(pending.detail.is_estimated);
        assert_eq!(pending.detail.status, "pending");
        assert_eq!(pending.detail.total_passes, 3);
        assert_eq!(pending.detail.routes_total_per_pass, 3);

        let waiting = secondary_progress(&identity, None, &counts(10, 10, 0));
        assert_eq!(waiting.detail.status, "waiting");

        let finished = RunIdentity {
            shutdown_type: Some("COMPLETED".into()),
            ..identity
        };
        let done = secondary_progress(&finished, None, &counts(10, 10, 0));
        assert!((done.percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(done.detail.status, "completed");
    }

    #[test]
    fn completed_secondary_state_forces_100() {
        let state = SecondaryPhaseState {
            percent: 97.4,
            status: Some("completed".into()),
            ..SecondaryPhaseState::default()
        };
        let progress = secondary_progress(&enabled_identity(), Some(&state), &counts(1, 1, 0));
        assert!((progress.percent - 100.0).abs() < f64::EPSILON);
        assert!(!progress.detail.is_estimated);
        assert_eq!(progress.detail.total_passes, 2);
    }

    #[test]
    fn disabled_secondary_reports_zeros() {
        let progress = secondary_progress(&RunIdentity::default(), None, &counts(1, 0, 0));
        assert_eq!(progress.detail.status, "disabled");
        assert_eq!(progress.detail.total_passes, 0);
    }

    #[test]
    fn empty_read_still_populates_every_field() {
        let snapshot = assemble(inputs(CheckpointRead::empty(BackendKind::Json, &[9222])));
        assert_eq!(snapshot.status, RunStatus::NoData);
        assert_eq!(snapshot.config.run_id, "unknown");
        assert_eq!(snapshot.config.ports_count, 3);
        assert_eq!(snapshot.config.date_range, "N/A");
        assert_eq!(snapshot.payload, default_payload());
        assert_eq!(snapshot.validation["passed"], true);

        let wire = serde_json::to_value(&snapshot).unwrap();
        for key in [
            "timestamp", "status", "running", "active_workers", "paths", "config", "progress",
            "tasks", "workers", "pending_routes", "running_tasks", "excel_files", "excel_count",
            "speed_metrics", "eta", "oal_details", "live_logs", "flight_booking_data",
            "validation",
        ] {
            assert!(wire.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(wire["paths"]["backend"], "json");
        assert_eq!(wire["eta"]["total_eta_formatted"], "N/A");
        assert!(wire["eta"]["total_eta"].is_null());
    }

    #[test]
    fn running_tasks_keep_only_running_records() {
        let mut read = CheckpointRead::empty(BackendKind::Json, &[]);
        read.progress = ProgressSummary::from_counts(counts(2, 1, 1));
        read.tasks = vec![
            TaskRecord {
                id: "a".into(),
                status: TaskState::Done,
                ..TaskRecord::default()
            },
            TaskRecord {
                id: "b".into(),
                status: TaskState::Running,
                ..TaskRecord::default()
            },
        ];
        let snapshot = assemble(inputs(read));
        assert_eq!(snapshot.status, RunStatus::Running);
        assert_eq!(snapshot.active_workers, 1);
        assert_eq!(snapshot.running_tasks.len(), 1);
        assert_eq!(snapshot.running_tasks[0].id, "b");
    }
}
