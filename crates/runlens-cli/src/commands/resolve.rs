use std::path::Path;

use anyhow::Result;
use runlens_engine::Monitor;

/// Execute the `resolve` command: print where the active run lives.
pub fn execute(config_path: Option<&Path>, force: bool) -> Result<()> {
    let config = super::load_config(config_path)?;
    let mut monitor = Monitor::new(config);
    let location = monitor.resolve(force);
    let source = monitor
        .resolver()
        .source()
        .map_or("unknown", |s| s.as_str());

    println!("{:18} {}", "Source:", source);
    println!("{:18} {}", "Output dir:", location.output_dir.display());
    println!("{:18} {}", "Checkpoint dir:", location.checkpoint_dir.display());
    println!("{:18} {}", "Logs dir:", location.logs_dir.display());
    println!("{:18} {}", "Backend:", location.backend);
    println!("{:18} {}", "Scans:", monitor.resolver().scan_count());
    for dir in &monitor.resolver().settings().base_dirs {
        println!("{:18} {}", "Base dir:", dir.display());
    }
    Ok(())
}
