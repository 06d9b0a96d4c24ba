//! Remaining-time projection per phase and the blended overall figure.

use runlens_types::metrics::{Eta, NOT_AVAILABLE};
use runlens_types::secondary::SecondaryPhaseState;
use runlens_types::task::TaskCounts;

/// Projection for one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEta {
    Done,
    Minutes(f64),
    /// Work remains but no rate is known.
    Unknown,
    Disabled,
}

impl PhaseEta {
    #[must_use]
    pub fn minutes(self) -> Option<f64> {
        match self {
            Self::Minutes(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Done => "Done".to_string(),
            Self::Minutes(m) => format_duration(m),
            Self::Unknown => NOT_AVAILABLE.to_string(),
            Self::Disabled => "Disabled".to_string(),
        }
    }
}

/// Primary queue: remaining tasks over the observed throughput.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn primary_eta(counts: &TaskCounts, speed_per_minute: f64) -> PhaseEta {
    let remaining = counts.total.saturating_sub(counts.done);
    if remaining == 0 {
        PhaseEta::Done
    } else if speed_per_minute > 0.0 {
        PhaseEta::Minutes(remaining as f64 / speed_per_minute)
    } else {
        PhaseEta::Unknown
    }
}

/// Secondary phase: remaining operations over `workers * rate_per_worker`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn secondary_eta(
    workers: u32,
    state: Option<&SecondaryPhaseState>,
    rate_per_worker: f64,
) -> PhaseEta {
    if workers == 0 {
        return PhaseEta::Disabled;
    }
    let Some(state) = state else {
        return PhaseEta::Unknown;
    };
    let remaining = state.remaining_operations();
    if state.is_completed() || remaining <= 0 {
        return PhaseEta::Done;
    }
    let rate = f64::from(workers) * rate_per_worker;
    if rate <= 0.0 {
        return PhaseEta::Unknown;
    }
    PhaseEta::Minutes(remaining as f64 / rate)
}

/// The phases run concurrently, so the slower known phase bounds the
/// total. A phase without an estimate yet does not hide the other one.
#[must_use]
pub fn overall_eta(primary: PhaseEta, secondary: PhaseEta) -> PhaseEta {
    match (primary, secondary) {
        (p, PhaseEta::Disabled) => p,
        (PhaseEta::Done, PhaseEta::Done) => PhaseEta::Done,
        (PhaseEta::Minutes(p), PhaseEta::Minutes(s)) => PhaseEta::Minutes(p.max(s)),
        (PhaseEta::Minutes(m), _) | (_, PhaseEta::Minutes(m)) => PhaseEta::Minutes(m),
        _ => PhaseEta::Unknown,
    }
}

/// All three projections in wire form.
#[must_use]
pub fn estimate(
    counts: &TaskCounts,
    speed_per_minute: f64,
    secondary_workers: u32,
    secondary_state: Option<&SecondaryPhaseState>,
    rate_per_worker: f64,
) -> Eta {
    let primary = primary_eta(counts, speed_per_minute);
    let secondary = secondary_eta(secondary_workers, secondary_state, rate_per_worker);
    let overall = overall_eta(primary, secondary);
    Eta {
        lf_eta: primary.minutes(),
        oal_eta: secondary.minutes(),
        total_eta: overall.minutes(),
        lf_eta_formatted: primary.label(),
        oal_eta_formatted: secondary.label(),
        total_eta_formatted: overall.label(),
    }
}

/// `"< 1 min"`, `"N min"`, `"Xh Ym"` or `"Xh"`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(minutes: f64) -> String {
    if minutes < 1.0 {
        return "< 1 min".to_string();
    }
    let whole = minutes.floor() as u64;
    if whole < 60 {
        return format!("{whole} min");
    }
    let (hours, mins) = (whole / 60, whole % 60);
    if mins == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {mins}m")
    }
}
