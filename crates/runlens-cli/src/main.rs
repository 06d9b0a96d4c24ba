mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "runlens",
    version,
    about = "Live progress monitor for checkpointed extraction pipelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the active run and keep the status file up to date
    Watch {
        /// Path to monitor YAML file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Status file to write (default: `<project_root>/dashboard_status.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Stop after this many polls
        #[arg(long)]
        iterations: Option<u64>,
    },
    /// Poll once and print the snapshot as JSON
    Snapshot {
        /// Path to monitor YAML file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the resolved active run location
    Resolve {
        /// Path to monitor YAML file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Bypass the resolution cache
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Watch {
            config,
            output,
            iterations,
        } => commands::watch::execute(config.as_deref(), output.as_deref(), iterations).await,
        Commands::Snapshot { config, pretty } => {
            commands::snapshot::execute(config.as_deref(), pretty)
        }
        Commands::Resolve { config, force } => commands::resolve::execute(config.as_deref(), force),
    }
}
