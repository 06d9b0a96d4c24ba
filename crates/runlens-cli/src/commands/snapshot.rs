use std::path::Path;

use anyhow::{Context, Result};
use runlens_engine::Monitor;

/// Execute the `snapshot` command: one poll, JSON on stdout.
pub fn execute(config_path: Option<&Path>, pretty: bool) -> Result<()> {
    let config = super::load_config(config_path)?;
    let snapshot = Monitor::new(config).poll();
    let json = if pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        serde_json::to_string(&snapshot)
    }
    .context("Failed to serialize snapshot")?;
    println!("{json}");
    Ok(())
}
