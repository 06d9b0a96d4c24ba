//! Semantic validation for parsed monitor configuration values.

use anyhow::{bail, Result};

use crate::config::types::{MonitorConfig, CONFIG_VERSION};

/// Validate a parsed monitor configuration.
///
/// # Errors
///
/// Returns an error listing every validation failure found.
pub fn validate_config(config: &MonitorConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != CONFIG_VERSION {
        errors.push(format!(
            "Unsupported config version '{}', expected '{CONFIG_VERSION}'",
            config.version
        ));
    }

    if config.poll.interval_ms == 0 {
        errors.push("poll.interval_ms must be > 0".to_string());
    }
    if config.poll.resolve_ttl_ms == 0 {
        errors.push("poll.resolve_ttl_ms must be > 0".to_string());
    }
    if config.scan.max_depth == 0 {
        errors.push("scan.max_depth must be at least 1".to_string());
    }
    if config.scan.max_entries == 0 {
        errors.push("scan.max_entries must be at least 1".to_string());
    }
    if config.sqlite.lease_duration_secs == 0 {
        errors.push("sqlite.lease_duration_secs must be > 0".to_string());
    }

    let rate = config.estimates.secondary_rate_per_worker;
    if !rate.is_finite() || rate <= 0.0 {
        errors.push(format!(
            "estimates.secondary_rate_per_worker must be a positive number, got {rate}"
        ));
    }
    if config.estimates.expected_artifacts == 0 {
        errors.push("estimates.expected_artifacts must be at least 1".to_string());
    }
    let ext = config.estimates.artifact_extension.trim();
    if ext.is_empty() || ext.starts_with('.') {
        errors.push(format!(
            "estimates.artifact_extension must be a bare extension like 'xlsx', got '{}'",
            config.estimates.artifact_extension
        ));
    }

    if config.logs.tail_lines == 0 {
        errors.push("logs.tail_lines must be at least 1".to_string());
    }

    if config.paths.output_dir_env.trim().is_empty() {
        errors.push("paths.output_dir_env must not be empty".to_string());
    }

    if !errors.is_empty() {
        bail!("Config validation failed:\n  - {}", errors.join("\n  - "));
    }

    Ok(())
}
