//! Throughput, error-rate and ETA figures published with each snapshot.

use serde::{Deserialize, Serialize};

/// Placeholder for an estimate that cannot be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sliding-window throughput and error figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedMetrics {
    /// Completed tasks per minute over the throughput window, 2 decimals.
    pub speed_per_minute: f64,
    /// `speed_per_minute * 60`, 1 decimal.
    pub speed_per_hour: f64,
    /// Failures observed inside the error window.
    pub recent_errors: u64,
    /// Failures per minute over the error window, 2 decimals.
    pub error_rate: f64,
    /// Samples currently held in the throughput window.
    pub data_points: usize,
}

/// Remaining-time estimate per phase plus the blended overall figure.
///
/// Minutes are `None` whenever the matching string is not a duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eta {
    pub lf_eta: Option<f64>,
    pub oal_eta: Option<f64>,
    pub total_eta: Option<f64>,
    pub lf_eta_formatted: String,
    pub oal_eta_formatted: String,
    pub total_eta_formatted: String,
}

impl Default for Eta {
    fn default() -> Self {
        Self {
            lf_eta: None,
            oal_eta: None,
            total_eta: None,
            lf_eta_formatted: NOT_AVAILABLE.to_string(),
            oal_eta_formatted: NOT_AVAILABLE.to_string(),
            total_eta_formatted: NOT_AVAILABLE.to_string(),
        }
    }
}
