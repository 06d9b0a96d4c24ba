//! Monitor YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::MonitorConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut missing = Vec::new();

    let result = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        std::env::var(var_name).unwrap_or_else(|_| {
            if !missing.iter().any(|m| m == var_name) {
                missing.push(var_name.to_string());
            }
            String::new()
        })
    });

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result.into_owned())
}

/// Parse a monitor YAML string (after env var substitution).
///
/// An empty document yields the default configuration.
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_config_str(yaml_str: &str) -> Result<MonitorConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    if substituted.trim().is_empty() {
        return Ok(MonitorConfig::default());
    }
    let config: MonitorConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse monitor YAML")?;
    Ok(config)
}

/// Parse a monitor YAML file.
///
/// A relative `project_root` is taken relative to the file's directory.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_config(path: &Path) -> Result<MonitorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config = parse_config_str(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.project_root = match config.project_root.take() {
        Some(root) if root.is_relative() => Some(base.join(root)),
        Some(root) => Some(root),
        None => Some(base.to_path_buf()),
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RL_TEST_ROOT", "/srv/insights");
        let result = substitute_env_vars("project_root: ${RL_TEST_ROOT}").unwrap();
        assert_eq!(result, "project_root: /srv/insights");
        std::env::remove_var("RL_TEST_ROOT");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "poll:\n  interval_ms: 500";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_multiple_missing_env_vars_all_reported() {
        let err = substitute_env_vars("${RL_MISSING_X} and ${RL_MISSING_Y} ${RL_MISSING_X}")
            .unwrap_err()
            .to_string();
        assert!(err.contains("RL_MISSING_X, RL_MISSING_Y"));
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(parse_config_str("").unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        std::env::set_var("RL_TEST_RUNS", "/mnt/runs");
        let yaml = r#"
version: "1.0"
paths:
  base_output_dirs: [outputs, "${RL_TEST_RUNS}"]
poll:
  interval_ms: 500
estimates:
  secondary_rate_per_worker: 2.0
default_ports: [9300]
"#;
        let config = parse_config_str(yaml).unwrap();
        assert_eq!(
            config.paths.base_output_dirs,
            vec![PathBuf::from("outputs"), PathBuf::from("/mnt/runs")]
        );
        assert_eq!(config.poll.interval_ms, 500);
        assert_eq!(config.poll.resolve_ttl_ms, 2_000);
        assert!((config.estimates.secondary_rate_per_worker - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.estimates.expected_artifacts, 4);
        assert_eq!(config.default_ports, vec![9300]);
        std::env::remove_var("RL_TEST_RUNS");
    }

    #[test]
    fn test_parse_invalid_yaml_errors() {
        assert!(parse_config_str("this is not: [valid: yaml: {{{}}}").is_err());
    }

    #[test]
    fn test_config_file_roots_relative_paths_at_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runlens.yaml");
        std::fs::write(&path, "project_root: project\n").unwrap();
        let config = parse_config(&path).unwrap();
        assert_eq!(config.project_root, Some(dir.path().join("project")));
    }

    #[test]
    fn test_parse_config_file_not_found() {
        let err = parse_config(Path::new("/nonexistent/runlens.yaml"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Failed to read config file"));
    }
}
