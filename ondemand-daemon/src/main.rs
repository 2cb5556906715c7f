//! ondemand-daemon binary entry point.
//!
//! Parses CLI arguments, loads configuration, initializes logging, and
//! hands control to the [`Orchestrator`].

use anyhow::Result;
use clap::Parser;

use ondemand_core::config::OndemandConfig;
use ondemand_daemon::cli::DaemonCli;
use ondemand_daemon::logging;
use ondemand_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = OndemandConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;

    // CLI overrides take precedence over file and environment.
    if let Some(log_level) = &cli.log_level {
        config.general.log_level = log_level.clone();
    }
    if let Some(log_format) = &cli.log_format {
        config.general.log_format = log_format.clone();
    }
    if let Some(pid_file) = &cli.pid_file {
        config.general.pid_file = pid_file.clone();
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "ondemand-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("ondemand-daemon shut down");
    Ok(())
}
