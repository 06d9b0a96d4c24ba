//! Run identity as recorded in the checkpoint's run-state document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lenient::lenient;
use crate::time::parse_timestamp;

/// Pass count assumed when the run identity does not record one.
pub const DEFAULT_SECONDARY_PASSES: u32 = 2;

/// Shutdown marker the pipeline writes once a run has finished cleanly.
pub const SHUTDOWN_COMPLETED: &str = "COMPLETED";

/// Placeholder echoed for identity strings the run state does not carry.
pub const UNKNOWN: &str = "unknown";

/// Identity and configuration of one pipeline run.
///
/// Every field is optional on disk; accessors supply the defaults the
/// snapshot echoes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunIdentity {
    #[serde(default, deserialize_with = "lenient")]
    pub run_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mode: Option<String>,
    /// ISO-8601 start time, naive values are local time.
    #[serde(default, deserialize_with = "lenient")]
    pub started_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub routes: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub dates: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ports: Vec<u16>,
    #[serde(default, deserialize_with = "lenient")]
    pub chunks_count: u32,
    /// Secondary-phase worker count; zero disables the phase.
    #[serde(default, deserialize_with = "lenient")]
    pub oal_workers: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub oal_passes: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub shutdown_type: Option<String>,
}

impl RunIdentity {
    #[must_use]
    pub fn run_id(&self) -> &str {
        self.run_id.as_deref().unwrap_or(UNKNOWN)
    }

    #[must_use]
    pub fn mode(&self) -> &str {
        self.mode.as_deref().unwrap_or(UNKNOWN)
    }

    /// Parsed start time, `None` when absent or unparseable.
    #[must_use]
    pub fn started_at_utc(&self) -> Option<DateTime<Utc>> {
        self.started_at.as_deref().and_then(parse_timestamp)
    }

    #[must_use]
    pub fn secondary_passes(&self) -> u32 {
        self.oal_passes.unwrap_or(DEFAULT_SECONDARY_PASSES)
    }

    #[must_use]
    pub fn secondary_enabled(&self) -> bool {
        self.oal_workers > 0
    }

    /// `true` once the shutdown marker reads `COMPLETED` (case and
    /// surrounding whitespace ignored).
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.shutdown_type
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(SHUTDOWN_COMPLETED))
    }

    /// `"<last> to <first>"` over the date list, `"N/A"` when empty.
    #[must_use]
    pub fn date_range(&self) -> String {
        match (self.dates.first(), self.dates.last()) {
            (Some(first), Some(last)) => format!("{last} to {first}"),
            _ => "N/A".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_document_is_empty() {
        let run: RunIdentity = serde_json::from_str("{}").unwrap();
        assert_eq!(run.run_id(), "unknown");
        assert_eq!(run.mode(), "unknown");
        assert_eq!(run.secondary_passes(), 2);
        assert!(!run.secondary_enabled());
        assert!(!run.is_completed());
        assert_eq!(run.date_range(), "N/A");
    }

    #[test]
    fn parses_full_document() {
        let run: RunIdentity = serde_json::from_str(
            r#"{
                "run_id": "run_20251218",
                "mode": "BY_STATION",
                "started_at": "2025-12-18T06:21:01Z",
                "routes": ["CAI-JED", "CAI-RUH"],
                "dates": ["2026-01-31", "2026-01-01"],
                "ports": [9222, 9223],
                "chunks_count": 12,
                "oal_workers": 2,
                "oal_passes": 3,
                "shutdown_type": " completed "
            }"#,
        )
        .unwrap();
        assert_eq!(run.run_id(), "run_20251218");
        assert_eq!(run.ports, vec![9222, 9223]);
        assert_eq!(run.secondary_passes(), 3);
        assert!(run.secondary_enabled());
        assert!(run.is_completed());
        assert_eq!(run.date_range(), "2026-01-01 to 2026-01-31");
        assert!(run.started_at_utc().is_some());
    }

    #[test]
    fn malformed_field_keeps_the_rest() {
        let run: RunIdentity =
            serde_json::from_str(r#"{"run_id": "r1", "ports": "9222", "oal_workers": -1}"#)
                .unwrap();
        assert_eq!(run.run_id(), "r1");
        assert!(run.ports.is_empty());
        assert_eq!(run.oal_workers, 0);
    }
}
