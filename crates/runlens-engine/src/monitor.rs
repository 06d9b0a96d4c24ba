//! The poll cycle tying resolution, reading, metrics and assembly
//! together.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use runlens_state::artifacts::{
    load_payload, load_run_identity, load_secondary_state, load_validation,
};
use runlens_state::logs::tail_log;
use runlens_state::outputs::list_generated_outputs;
use runlens_state::read_checkpoint;
use runlens_types::location::CheckpointLocation;
use runlens_types::run::RunIdentity;
use runlens_types::snapshot::StatusSnapshot;
use runlens_types::time::to_epoch_secs;

use crate::config::types::MonitorConfig;
use crate::eta;
use crate::metrics::MetricsEngine;
use crate::resolve::PathResolver;
use crate::snapshot::{assemble, SnapshotInputs};

/// Ports recorded by the run, or the configured defaults without one.
#[must_use]
pub fn effective_ports(identity: Option<&RunIdentity>, defaults: &[u16]) -> Vec<u16> {
    identity.map_or_else(|| defaults.to_vec(), |i| i.ports.clone())
}

/// Single-owner polling state: the resolver cache and the metrics
/// windows live here and nowhere else.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    resolver: PathResolver,
    metrics: MetricsEngine,
    payload_fallbacks: Vec<PathBuf>,
}

impl Monitor {
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        let resolver = PathResolver::from_config(&config);
        Self::with_resolver(config, resolver)
    }

    #[must_use]
    pub fn with_resolver(config: MonitorConfig, resolver: PathResolver) -> Self {
        let payload_fallbacks = config.payload_fallbacks();
        Self {
            config,
            resolver,
            metrics: MetricsEngine::new(),
            payload_fallbacks,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn resolve(&mut self, force: bool) -> CheckpointLocation {
        self.resolver.resolve(force)
    }

    pub fn poll(&mut self) -> StatusSnapshot {
        self.poll_at(Utc::now())
    }

    /// One full cycle with `now` as the sample time. Never fails; every
    /// unreadable artifact degrades to its default.
    pub fn poll_at(&mut self, now: DateTime<Utc>) -> StatusSnapshot {
        let location = self.resolver.resolve(false);
        let identity = load_run_identity(&location);
        let ports = effective_ports(identity.as_ref(), &self.config.default_ports);

        let read = read_checkpoint(&location, &ports, &self.config.reader_options());
        let secondary_state = load_secondary_state(&location);
        let counts = read.progress.counts;

        let speed = self.metrics.observe_run(
            &location.checkpoint_dir,
            to_epoch_secs(now),
            counts.done,
            counts.failed,
        );
        let estimates = &self.config.estimates;
        let eta = eta::estimate(
            &counts,
            speed.speed_per_minute,
            identity.as_ref().map_or(0, |i| i.oal_workers),
            secondary_state.as_ref(),
            estimates.secondary_rate_per_worker,
        );

        let artifact_files = list_generated_outputs(
            &location.output_dir,
            &estimates.artifact_extension,
            identity.as_ref().and_then(RunIdentity::started_at_utc),
        );
        let latest_log = self.resolver.latest_log(&location.logs_dir);
        let logs = tail_log(latest_log.as_deref(), self.config.logs.tail_lines);
        let payload = load_payload(&location, &self.payload_fallbacks);
        let validation = load_validation(&location);

        assemble(SnapshotInputs {
            timestamp: now,
            base_dirs: self.resolver.settings().base_dirs.clone(),
            location,
            identity,
            ports,
            read,
            secondary_state,
            artifact_files,
            expected_artifacts: estimates.expected_artifacts,
            speed,
            eta,
            logs,
            payload,
            validation,
        })
    }
}
