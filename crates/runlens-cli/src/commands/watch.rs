use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use runlens_engine::Monitor;
use runlens_types::snapshot::StatusSnapshot;
use tokio::time::MissedTickBehavior;

/// Default status file name, relative to the project root.
pub const DEFAULT_STATUS_FILE: &str = "dashboard_status.json";

/// Execute the `watch` command: poll on a fixed cadence until
/// interrupted or `iterations` polls have run.
pub async fn execute(
    config_path: Option<&Path>,
    output: Option<&Path>,
    iterations: Option<u64>,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let output = output.map_or_else(
        || config.resolve_path(Path::new(DEFAULT_STATUS_FILE)),
        Path::to_path_buf,
    );
    let interval = config.poll_interval();
    let mut monitor = Monitor::new(config);

    tracing::info!(
        output = %output.display(),
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        "Watching pipeline checkpoints"
    );

    run_polls(
        &mut monitor,
        &output,
        interval,
        iterations,
        tokio::signal::ctrl_c(),
    )
    .await;
    Ok(())
}

/// Poll every `interval` until `shutdown` resolves or `iterations` polls
/// have run. Returns the number of polls.
///
/// `shutdown` is a single future polled across ticks, so a signal that
/// lands during a poll is seen at the next select.
async fn run_polls<F: Future>(
    monitor: &mut Monitor,
    output: &Path,
    interval: Duration,
    iterations: Option<u64>,
    shutdown: F,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);
    let mut polls = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!(polls, "Interrupted, stopping");
                break;
            }
            _ = ticker.tick() => {}
        }

        // Each poll is a short blocking read of local files.
        let snapshot = tokio::task::block_in_place(|| monitor.poll());
        match write_atomically(output, &snapshot) {
            Ok(()) => log_summary(&snapshot),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "Failed to write status file"),
        }

        polls += 1;
        if iterations.is_some_and(|limit| polls >= limit) {
            break;
        }
    }

    polls
}

fn log_summary(snapshot: &StatusSnapshot) {
    tracing::info!(
        status = %snapshot.status,
        backend = %snapshot.paths.backend,
        done = snapshot.tasks.done,
        total = snapshot.tasks.total,
        failed = snapshot.tasks.failed,
        overall = snapshot.progress.overall,
        speed_per_minute = snapshot.speed_metrics.speed_per_minute,
        eta = %snapshot.eta.total_eta_formatted,
        "Poll complete"
    );
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `snapshot` to a sibling temp file and rename it over `path`, so
/// readers never see a partial document.
pub fn write_atomically(path: &Path, snapshot: &StatusSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(snapshot).context("Failed to serialize snapshot")?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, json)
        .with_context(|| format!("Failed to write status file: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace status file: {}", path.display()))?;
    Ok(())
}
