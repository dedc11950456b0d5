//! Binary entrypoint.
//! Loads the TOML config, wires the monitor and runs one cycle or the
//! continuous polling loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bili_monitor::config::load_config;
use bili_monitor::poller::Monitor;

#[derive(Debug, Parser)]
#[command(name = "bili-monitor", about = "Monitor bilibili users and send notifications")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single polling cycle instead of the continuous loop.
    #[arg(long)]
    once: bool,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    let mut monitor = Monitor::new(config)?;
    if cli.once {
        monitor.run_once().await;
    } else {
        monitor.run_forever().await;
    }
    Ok(())
}
