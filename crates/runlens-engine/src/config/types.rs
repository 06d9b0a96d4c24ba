//! Monitor configuration model.
//!
//! Every key is optional; the defaults match the layout the producing
//! pipeline writes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use runlens_state::{ReaderOptions, ScanLimits};
use serde::Deserialize;

pub const CONFIG_VERSION: &str = "1.0";

/// Environment variable naming an extra base output directory.
pub const DEFAULT_OUTPUT_DIR_ENV: &str = "RUNLENS_OUTPUT_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Directory relative paths resolve against; defaults to the current
    /// directory.
    #[serde(default)]
    pub project_root: Option<PathBuf>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub sqlite: SqliteConfig,
    #[serde(default)]
    pub estimates: EstimateConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub payload: PayloadConfig,
    /// Worker ports assumed when no run identity exists.
    #[serde(default = "default_ports")]
    pub default_ports: Vec<u16>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            project_root: None,
            paths: PathsConfig::default(),
            poll: PollConfig::default(),
            scan: ScanConfig::default(),
            sqlite: SqliteConfig::default(),
            estimates: EstimateConfig::default(),
            logs: LogsConfig::default(),
            payload: PayloadConfig::default(),
            default_ports: default_ports(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_pointer_file")]
    pub pointer_file: PathBuf,
    #[serde(default = "default_base_output_dirs")]
    pub base_output_dirs: Vec<PathBuf>,
    #[serde(default = "default_output_dir_env")]
    pub output_dir_env: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pointer_file: default_pointer_file(),
            base_output_dirs: default_base_output_dirs(),
            output_dir_env: default_output_dir_env(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub resolve_ttl_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            resolve_ttl_ms: default_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SqliteConfig {
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_lease_duration_secs")]
    pub lease_duration_secs: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            lease_duration_secs: default_lease_duration_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EstimateConfig {
    /// Secondary-phase operations per minute each worker is assumed to
    /// complete.
    #[serde(default = "default_secondary_rate")]
    pub secondary_rate_per_worker: f64,
    #[serde(default = "default_expected_artifacts")]
    pub expected_artifacts: u32,
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            secondary_rate_per_worker: default_secondary_rate(),
            expected_artifacts: default_expected_artifacts(),
            artifact_extension: default_artifact_extension(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            tail_lines: default_tail_lines(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PayloadConfig {
    /// Extra payload locations tried after the checkpoint copy.
    #[serde(default)]
    pub fallback_paths: Vec<PathBuf>,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_pointer_file() -> PathBuf {
    PathBuf::from(".active_output_dir")
}

fn default_base_output_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("outputs")]
}

fn default_output_dir_env() -> String {
    DEFAULT_OUTPUT_DIR_ENV.to_string()
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_max_depth() -> usize {
    ScanLimits::default().max_depth
}

fn default_max_entries() -> usize {
    ScanLimits::default().max_entries
}

fn default_busy_timeout_ms() -> u64 {
    1_000
}

fn default_lease_duration_secs() -> u64 {
    900
}

fn default_secondary_rate() -> f64 {
    1.5
}

fn default_expected_artifacts() -> u32 {
    4
}

fn default_artifact_extension() -> String {
    "xlsx".to_string()
}

fn default_tail_lines() -> usize {
    20
}

fn default_ports() -> Vec<u16> {
    vec![9222, 9223, 9224]
}

impl MonitorConfig {
    /// Configuration rooted at `root`, otherwise default.
    #[must_use]
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: Some(root.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn project_root(&self) -> PathBuf {
        self.project_root.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        })
    }

    /// `path` if absolute, otherwise joined onto the project root.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root().join(path)
        }
    }

    #[must_use]
    pub fn pointer_file(&self) -> PathBuf {
        self.resolve_path(&self.paths.pointer_file)
    }

    /// Base directories to scan: the environment override first, then
    /// the configured list, without duplicates.
    #[must_use]
    pub fn base_output_dirs(&self) -> Vec<PathBuf> {
        let env_dir = std::env::var_os(&self.paths.output_dir_env)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.base_output_dirs_with(env_dir)
    }

    #[must_use]
    pub fn base_output_dirs_with(&self, env_dir: Option<PathBuf>) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for dir in env_dir.iter().chain(self.paths.base_output_dirs.iter()) {
            let resolved = self.resolve_path(dir);
            if !dirs.contains(&resolved) {
                dirs.push(resolved);
            }
        }
        dirs
    }

    #[must_use]
    pub fn payload_fallbacks(&self) -> Vec<PathBuf> {
        self.payload
            .fallback_paths
            .iter()
            .map(|p| self.resolve_path(p))
            .collect()
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    #[must_use]
    pub fn resolve_ttl(&self) -> Duration {
        Duration::from_millis(self.poll.resolve_ttl_ms)
    }

    #[must_use]
    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            max_depth: self.scan.max_depth,
            max_entries: self.scan.max_entries,
        }
    }

    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            busy_timeout: Duration::from_millis(self.sqlite.busy_timeout_ms),
            lease_duration: Duration::from_secs(self.sqlite.lease_duration_secs),
        }
    }
}
