//! Sliding-window throughput and error tracking across polls.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use runlens_types::metrics::SpeedMetrics;
use runlens_types::task::round_to;

/// Seconds of done-count samples kept for throughput.
pub const THROUGHPUT_WINDOW_SECS: f64 = 60.0;
/// Seconds of failure events kept for the error rate.
pub const ERROR_WINDOW_SECS: f64 = 300.0;

const ERROR_WINDOW_MINUTES: f64 = ERROR_WINDOW_SECS / 60.0;

/// Owns the only state that survives between polls.
///
/// Both windows are pruned by time on every sample, so their size is
/// bounded by the poll cadence and never by run length. Failed counts
/// are assumed non-decreasing within a run; a drop only moves the
/// baseline.
#[derive(Debug, Default)]
pub struct MetricsEngine {
    done_samples: VecDeque<(f64, u64)>,
    failure_events: VecDeque<(f64, u64)>,
    last_failed: Option<u64>,
    run: Option<PathBuf>,
}

impl MetricsEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard both windows and the failed-count baseline.
    pub fn reset(&mut self) {
        self.done_samples.clear();
        self.failure_events.clear();
        self.last_failed = None;
    }

    /// Samples currently held in the throughput window.
    #[must_use]
    pub fn data_points(&self) -> usize {
        self.done_samples.len()
    }

    /// [`observe`](Self::observe) for the run at `checkpoint_dir`,
    /// resetting first when the run differs from the previous sample's.
    pub fn observe_run(
        &mut self,
        checkpoint_dir: &Path,
        now_secs: f64,
        done: u64,
        failed: u64,
    ) -> SpeedMetrics {
        if self.run.as_deref() != Some(checkpoint_dir) {
            if let Some(previous) = &self.run {
                tracing::info!(
                    from = %previous.display(),
                    to = %checkpoint_dir.display(),
                    "Active run changed, resetting metrics windows"
                );
            }
            self.reset();
            self.run = Some(checkpoint_dir.to_path_buf());
        }
        self.observe(now_secs, done, failed)
    }

    /// Fold one `(now, done, failed)` sample in and return the figures.
    #[allow(clippy::cast_precision_loss)]
    pub fn observe(&mut self, now_secs: f64, done: u64, failed: u64) -> SpeedMetrics {
        self.done_samples.push_back((now_secs, done));
        let cutoff = now_secs - THROUGHPUT_WINDOW_SECS;
        while self.done_samples.front().is_some_and(|&(t, _)| t <= cutoff) {
            self.done_samples.pop_front();
        }

        if let Some(previous) = self.last_failed {
            if failed > previous {
                self.failure_events.push_back((now_secs, failed - previous));
            }
        }
        self.last_failed = Some(failed);
        let error_cutoff = now_secs - ERROR_WINDOW_SECS;
        while self
            .failure_events
            .front()
            .is_some_and(|&(t, _)| t <= error_cutoff)
        {
            self.failure_events.pop_front();
        }

        let speed = self.speed_per_minute();
        let recent_errors: u64 = self.failure_events.iter().map(|&(_, n)| n).sum();
        SpeedMetrics {
            speed_per_minute: round_to(speed, 2),
            speed_per_hour: round_to(speed * 60.0, 1),
            recent_errors,
            error_rate: round_to(recent_errors as f64 / ERROR_WINDOW_MINUTES, 2),
            data_points: self.done_samples.len(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn speed_per_minute(&self) -> f64 {
        let (Some(&(t0, d0)), Some(&(t1, d1))) =
            (self.done_samples.front(), self.done_samples.back())
        else {
            return 0.0;
        };
        let elapsed = t1 - t0;
        if self.done_samples.len() < 2 || elapsed <= 0.0 {
            return 0.0;
        }
        (d1 as f64 - d0 as f64) / elapsed * 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_progress_gives_per_minute_speed() {
        let mut engine = MetricsEngine::new();
        engine.observe(0.0, 0, 0);
        engine.observe(30.0, 15, 0);
        let m = engine.observe(60.0, 30, 0);
        assert!((m.speed_per_minute - 30.0).abs() < f64::EPSILON);
        assert!((m.speed_per_hour - 1800.0).abs() < f64::EPSILON);
        // The t=0 sample sits exactly on the window edge.
        assert_eq!(m.data_points, 2);
    }

    #[test]
    fn single_sample_has_zero_speed() {
        let mut engine = MetricsEngine::new();
        let m = engine.observe(10.0, 500, 0);
        assert!(m.speed_per_minute.abs() < f64::EPSILON);
        assert_eq!(m.data_points, 1);
    }

    #[test]
    fn samples_older_than_window_are_pruned() {
        let mut engine = MetricsEngine::new();
        for i in 0..100u32 {
            engine.observe(f64::from(i) * 2.0, u64::from(i), 0);
        }
        // Only samples strictly inside the last 60 seconds remain.
        assert_eq!(engine.data_points(), 30);
    }

    #[test]
    fn failures_count_only_increases() {
        let mut engine = MetricsEngine::new();
        let m = engine.observe(0.0, 0, 7);
        assert_eq!(m.recent_errors, 0, "pre-existing failures are a baseline");
        engine.observe(10.0, 0, 10);
        engine.observe(20.0, 0, 4);
        let m = engine.observe(30.0, 0, 6);
        assert_eq!(m.recent_errors, 5);
        assert!((m.error_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failure_events_expire_after_error_window() {
        let mut engine = MetricsEngine::new();
        engine.observe(0.0, 0, 0);
        engine.observe(10.0, 0, 3);
        let m = engine.observe(311.0, 0, 3);
        assert_eq!(m.recent_errors, 0);
    }

    #[test]
    fn run_switch_discards_previous_samples() {
        let mut engine = MetricsEngine::new();
        engine.observe_run(Path::new("/a/checkpoints"), 0.0, 0, 0);
        engine.observe_run(Path::new("/a/checkpoints"), 30.0, 100, 0);
        let m = engine.observe_run(Path::new("/b/checkpoints"), 40.0, 3, 9);
        assert_eq!(m.data_points, 1);
        assert!(m.speed_per_minute.abs() < f64::EPSILON);
        assert_eq!(m.recent_errors, 0);
    }
}
