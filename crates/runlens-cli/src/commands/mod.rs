pub mod resolve;
pub mod snapshot;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use runlens_engine::{parse_config, validate_config, MonitorConfig};

/// The configuration at `path`, or defaults rooted at the current
/// directory. Validated either way.
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let config = match path {
        Some(path) => parse_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    validate_config(&config)?;
    Ok(config)
}
