//! Active-run resolution.
//!
//! A pointer artifact written by the pipeline wins outright. Without one,
//! every `checkpoints/run_state.json` under the base directories is a
//! candidate and the highest-ranked one becomes the active run. The
//! result is cached for a short TTL so scans stay cadence-gated.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use runlens_state::artifacts::load_document;
use runlens_state::logs::find_latest_log;
use runlens_state::scan::{files_under, modified};
use runlens_state::ScanLimits;
use runlens_types::location::{
    CheckpointLocation, PointerArtifact, CHECKPOINTS_DIR, RUN_STATE_FILE,
};
use runlens_types::run::RunIdentity;

use crate::config::types::MonitorConfig;

/// How the current location was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Pointer,
    Scan,
    /// Nothing found; the location may not exist.
    Default,
}

impl ResolutionSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pointer => "pointer",
            Self::Scan => "scan",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub pointer_file: PathBuf,
    /// Searched in order; the first existing one is also the default.
    pub base_dirs: Vec<PathBuf>,
    /// Output directory used when no base dir exists.
    pub fallback_output_dir: PathBuf,
    pub ttl: Duration,
    pub limits: ScanLimits,
}

impl ResolverSettings {
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            pointer_file: config.pointer_file(),
            base_dirs: config.base_output_dirs(),
            fallback_output_dir: config.project_root().join("outputs"),
            ttl: config.resolve_ttl(),
            limits: config.scan_limits(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResolution {
    location: CheckpointLocation,
    source: ResolutionSource,
    resolved_at: Instant,
}

/// Newest log file found under `logs_dir`, if any.
#[derive(Debug, Clone)]
struct CachedLog {
    logs_dir: PathBuf,
    path: Option<PathBuf>,
    found_at: Instant,
}

/// Ranking key of a scan candidate, compared field by field; the
/// greatest key wins.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CandidateRank {
    is_active: bool,
    last_activity: Option<SystemTime>,
    started_at: Option<DateTime<Utc>>,
    run_state_mtime: SystemTime,
    run_state_path: PathBuf,
}

impl CandidateRank {
    /// `None` when the run-state file cannot be stat'ed.
    fn for_run_state(run_state_path: &Path) -> Option<Self> {
        let run_state_mtime = modified(run_state_path)?;
        let location = CheckpointLocation::for_checkpoint_dir(run_state_path.parent()?);
        let identity: RunIdentity =
            load_document(run_state_path, "run_state").unwrap_or_default();
        let last_activity = location
            .activity_paths()
            .iter()
            .filter_map(|p| modified(p))
            .max();
        Some(Self {
            is_active: !identity.is_completed(),
            last_activity,
            started_at: identity.started_at_utc(),
            run_state_mtime,
            run_state_path: run_state_path.to_path_buf(),
        })
    }
}

/// Resolves and caches the active [`CheckpointLocation`].
#[derive(Debug)]
pub struct PathResolver {
    settings: ResolverSettings,
    cache: Option<CachedResolution>,
    scans: u64,
    log_cache: Option<CachedLog>,
    log_scans: u64,
}

impl PathResolver {
    #[must_use]
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            cache: None,
            scans: 0,
            log_cache: None,
            log_scans: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(ResolverSettings::from_config(config))
    }

    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Number of directory scans performed so far.
    #[must_use]
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    /// Source of the most recent resolution.
    #[must_use]
    pub fn source(&self) -> Option<ResolutionSource> {
        self.cache.as_ref().map(|c| c.source)
    }

    /// Number of log directory walks performed so far.
    #[must_use]
    pub fn log_scan_count(&self) -> u64 {
        self.log_scans
    }

    /// The active location, from cache while it is fresh.
    ///
    /// The backend tag is re-detected on every call, cached or not.
    /// Forcing also drops the cached log file.
    pub fn resolve(&mut self, force: bool) -> CheckpointLocation {
        if force {
            self.log_cache = None;
        } else {
            if let Some(cached) = self.cache.as_ref().filter(|c| self.is_fresh(c)) {
                let mut location = cached.location.clone();
                location.refresh_backend();
                tracing::debug!(dir = %location.checkpoint_dir.display(), "Using cached location");
                return location;
            }
        }

        let (location, source) = self.resolve_uncached();
        let previous = self.cache.as_ref().map(|c| c.location.checkpoint_dir.clone());
        if previous.as_ref() != Some(&location.checkpoint_dir) {
            tracing::info!(
                dir = %location.checkpoint_dir.display(),
                source = %source,
                backend = %location.backend,
                "Resolved active checkpoint location"
            );
        }
        self.cache = Some(CachedResolution {
            location: location.clone(),
            source,
            resolved_at: Instant::now(),
        });
        location
    }

    /// Newest `*.log` under `logs_dir`, cached on the same TTL as the
    /// location. A changed directory or a vanished file walks again.
    pub fn latest_log(&mut self, logs_dir: &Path) -> Option<PathBuf> {
        let fresh = self.log_cache.as_ref().filter(|c| {
            c.found_at.elapsed() < self.settings.ttl
                && c.logs_dir == logs_dir
                && c.path.as_ref().map_or(true, |p| p.is_file())
        });
        if let Some(cached) = fresh {
            return cached.path.clone();
        }

        self.log_scans += 1;
        let path = find_latest_log(logs_dir, self.settings.limits);
        tracing::debug!(
            dir = %logs_dir.display(),
            found = path.is_some(),
            "Scanned for latest log file"
        );
        self.log_cache = Some(CachedLog {
            logs_dir: logs_dir.to_path_buf(),
            path: path.clone(),
            found_at: Instant::now(),
        });
        path
    }

    fn is_fresh(&self, cached: &CachedResolution) -> bool {
        if cached.resolved_at.elapsed() >= self.settings.ttl {
            return false;
        }
        // A vanished pointer means the pipeline moved on.
        cached.source != ResolutionSource::Pointer || self.settings.pointer_file.is_file()
    }

    fn resolve_uncached(&mut self) -> (CheckpointLocation, ResolutionSource) {
        if let Some(output_dir) = self.read_pointer() {
            return (
                CheckpointLocation::for_output_dir(output_dir),
                ResolutionSource::Pointer,
            );
        }

        let candidates = self.scan_candidates();
        if let Some(best) = candidates
            .iter()
            .filter_map(|p| CandidateRank::for_run_state(p))
            .max()
        {
            if let Some(checkpoint_dir) = best.run_state_path.parent() {
                return (
                    CheckpointLocation::for_checkpoint_dir(checkpoint_dir),
                    ResolutionSource::Scan,
                );
            }
        }

        let output_dir = self
            .settings
            .base_dirs
            .iter()
            .find(|d| d.is_dir())
            .cloned()
            .unwrap_or_else(|| self.settings.fallback_output_dir.clone());
        tracing::debug!(dir = %output_dir.display(), "No run found, using default location");
        (
            CheckpointLocation::for_output_dir(output_dir),
            ResolutionSource::Default,
        )
    }

    /// Output directory named by the pointer, if it and its checkpoint
    /// directory exist. Relative targets resolve against the pointer's
    /// directory.
    fn read_pointer(&self) -> Option<PathBuf> {
        let pointer_file = &self.settings.pointer_file;
        if !pointer_file.is_file() {
            return None;
        }
        let pointer: PointerArtifact = load_document(pointer_file, "pointer")?;
        let target = pointer.active_output_dir?;
        let output_dir = if target.is_relative() {
            pointer_file
                .parent()
                .map_or_else(|| target.clone(), |base| base.join(&target))
        } else {
            target
        };
        if output_dir.is_dir() && output_dir.join(CHECKPOINTS_DIR).is_dir() {
            Some(output_dir)
        } else {
            tracing::debug!(dir = %output_dir.display(), "Pointer target missing, ignoring pointer");
            None
        }
    }

    fn scan_candidates(&mut self) -> Vec<PathBuf> {
        self.scans += 1;
        let limits = self.settings.limits;
        self.settings
            .base_dirs
            .iter()
            .filter(|base| base.is_dir())
            .flat_map(|base| files_under(base, limits))
            .map(walkdir::DirEntry::into_path)
            .filter(|path| is_run_state_file(path))
            .collect()
    }
}

fn is_run_state_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == RUN_STATE_FILE)
        && path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|n| n == CHECKPOINTS_DIR)
}
