//! Secondary enrichment phase ("OAL") state and its published detail.

use serde::{Deserialize, Serialize};

use crate::lenient::lenient;
use crate::run::DEFAULT_SECONDARY_PASSES;

/// Status string written by the pipeline once the phase has finished.
pub const STATUS_COMPLETED: &str = "completed";

/// Progress document the secondary phase keeps in the checkpoint dir.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecondaryPhaseState {
    #[serde(default, deserialize_with = "lenient")]
    pub percent: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub current_pass: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub total_passes: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub routes_completed_in_pass: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub routes_total_per_pass: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub total_operations: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub completed_operations: u64,
}

impl SecondaryPhaseState {
    #[must_use]
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or(crate::run::UNKNOWN)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(STATUS_COMPLETED))
    }

    #[must_use]
    pub fn total_passes(&self) -> u32 {
        self.total_passes.unwrap_or(DEFAULT_SECONDARY_PASSES)
    }

    /// `total - completed`, negative when the counters overshoot.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn remaining_operations(&self) -> i64 {
        self.total_operations as i64 - self.completed_operations as i64
    }
}

/// Secondary-phase block of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryPhaseDetail {
    pub current_pass: u32,
    pub total_passes: u32,
    pub routes_completed_in_pass: u32,
    pub routes_total_per_pass: u32,
    /// `true` when derived from the run identity because no state
    /// document exists yet.
    pub is_estimated: bool,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_phase_document() {
        let state: SecondaryPhaseState = serde_json::from_str(
            r#"{"percent": 42.5, "status": "running", "current_pass": 1,
                "total_passes": 2, "routes_completed_in_pass": 3,
                "routes_total_per_pass": 8, "total_operations": 16,
                "completed_operations": 11}"#,
        )
        .unwrap();
        assert_eq!(state.remaining_operations(), 5);
        assert_eq!(state.status(), "running");
        assert!(!state.is_completed());
    }

    #[test]
    fn defaults_total_passes() {
        let state: SecondaryPhaseState = serde_json::from_str(r#"{"status": "COMPLETED"}"#).unwrap();
        assert_eq!(state.total_passes(), 2);
        assert!(state.is_completed());
        assert_eq!(state.remaining_operations(), 0);
    }
}
