mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use hostwatch_core::{HostMonitor, MonitorConfig};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "hostwatch",
    version,
    about = "Host resource, firewall, account and service monitor"
)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the configured log and state directory
    #[arg(long)]
    log_directory: Option<PathBuf>,

    /// Run every monitor once and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config comes first: the log file lives in the configured directory.
    let mut config = MonitorConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(dir) = cli.log_directory {
        config.log_directory = dir;
    }

    let _log_guard = logging::init(&config.log_directory, &config.log_file)?;

    info!("hostwatch v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        config = %cli.config.display(),
        log_directory = %config.log_directory.display(),
        "configuration loaded"
    );

    let monitor = HostMonitor::new(config);
    let mut scheduler = monitor
        .scheduler()
        .context("Failed to set up monitors")?;

    if scheduler.is_empty() {
        warn!("all monitors are disabled, nothing to do");
        return Ok(());
    }

    if cli.once {
        scheduler.run_once().await;
        return Ok(());
    }

    let _workers = scheduler.spawn();

    // Workers run until the process is signalled; there is no drain phase.
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("received shutdown signal, exiting");

    Ok(())
}
