//! Worker orchestration -- assembly, shared state wiring, and
//! lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `ondemand-daemon`.
//! It loads configuration, creates the shared access set, builds both
//! workers, manages startup/shutdown ordering, and runs the main loop.
//!
//! # Startup Order (producer before consumer)
//!
//! 1. Log watcher (records accesses into the shared set)
//! 2. Reconciler (drains the set and acts on Docker)
//!
//! # Shutdown Order (same as startup)
//!
//! 1. Log watcher (stop producing accesses)
//! 2. Reconciler (last drain already happened; remaining accesses are
//!    intentionally discarded)

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use ondemand_core::AccessSet;
use ondemand_core::config::OndemandConfig;
use ondemand_core::metrics as metric_names;
use ondemand_core::worker::Worker;
use ondemand_log_watch::{LogWatcher, LogWatcherBuilder, WatcherConfig};
use ondemand_reconciler::{
    BollardDockerClient, ReconcileConfig, Reconciler, ReconcilerBuilder,
};

use crate::health::{DaemonHealth, WorkerHealth, aggregate_status};
use crate::metrics_server;

/// Seconds between periodic health report log lines.
const HEALTH_LOG_INTERVAL_SECS: u64 = 60;

/// The main daemon orchestrator.
///
/// Owns the shared access set and both workers, and manages the
/// complete lifecycle: configuration loading, ordered startup, health
/// monitoring, and graceful shutdown.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: OndemandConfig,
    /// Shared URL accumulator between the two workers.
    #[allow(dead_code)] // Kept for introspection in tests
    access_set: Arc<AccessSet>,
    /// Access-log watcher worker.
    watcher: LogWatcher,
    /// Container reconciler worker.
    reconciler: Reconciler<BollardDockerClient>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - Either worker fails to build
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = OndemandConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Useful for testing or when config has already been loaded.
    pub async fn build_from_config(config: OndemandConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before worker initialization
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let access_set = Arc::new(AccessSet::new());

        tracing::info!("initializing log watcher");
        let watcher = LogWatcherBuilder::new()
            .config(WatcherConfig::from_core(&config.log_watch))
            .access_set(Arc::clone(&access_set))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build log watcher: {}", e))?;

        tracing::info!("initializing reconciler");
        let docker = if config.reconciler.docker_socket.is_empty() {
            BollardDockerClient::connect_local()
        } else {
            BollardDockerClient::connect_with_socket(&config.reconciler.docker_socket)
        }
        .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?;

        let reconciler = ReconcilerBuilder::new()
            .config(ReconcileConfig::from_core(&config.reconciler))
            .docker(Arc::new(docker))
            .access_set(Arc::clone(&access_set))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build reconciler: {}", e))?;

        tracing::info!("orchestrator initialized");

        Ok(Self {
            config,
            access_set,
            watcher,
            reconciler,
            start_time: Instant::now(),
        })
    }

    /// Start both workers and enter the main loop.
    ///
    /// This method blocks until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        if !self.config.general.pid_file.is_empty() {
            write_pid_file(Path::new(&self.config.general.pid_file))?;
        }

        tracing::info!("starting log watcher");
        if let Err(e) = self.watcher.start().await {
            self.cleanup_pid_file();
            return Err(anyhow::anyhow!("failed to start log watcher: {}", e));
        }

        tracing::info!("starting reconciler");
        if let Err(e) = self.reconciler.start().await {
            // Rollback: stop the already-started watcher
            tracing::warn!("startup failed, rolling back log watcher");
            if let Err(stop_err) = self.watcher.stop().await {
                tracing::error!(
                    startup_error = %e,
                    rollback_error = %stop_err,
                    "rollback also failed during startup failure cleanup"
                );
            }
            self.cleanup_pid_file();
            return Err(anyhow::anyhow!("failed to start reconciler: {}", e));
        }

        tracing::info!("entering main loop");
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

        let mut health_interval =
            tokio::time::interval(Duration::from_secs(HEALTH_LOG_INTERVAL_SECS));
        health_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so the startup log is not doubled.
        health_interval.tick().await;

        let signal_name = loop {
            tokio::select! {
                _ = sigterm.recv() => break "SIGTERM",
                _ = sigint.recv() => break "SIGINT",
                _ = health_interval.tick() => {
                    let health = self.health().await;
                    tracing::info!(
                        status = %health.status,
                        uptime_secs = health.uptime_secs,
                        "periodic health report"
                    );
                }
            }
        };
        tracing::info!(signal = signal_name, "shutdown signal received");

        self.shutdown().await;
        self.cleanup_pid_file();
        Ok(())
    }

    /// Perform graceful shutdown of both workers, producer first.
    ///
    /// Stop failures are logged, never propagated: shutdown always runs
    /// to completion.
    async fn shutdown(&mut self) {
        tracing::info!("stopping workers");
        if let Err(e) = self.watcher.stop().await {
            tracing::error!(error = %e, "failed to stop log watcher");
        }
        if let Err(e) = self.reconciler.stop().await {
            tracing::error!(error = %e, "failed to stop reconciler");
        }
        tracing::info!(
            lines_seen = self.watcher.lines_seen(),
            cycles = self.reconciler.cycles(),
            starts = self.reconciler.starts(),
            stops = self.reconciler.stops(),
            "workers stopped"
        );
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let workers = vec![
            WorkerHealth {
                name: self.watcher.name().to_owned(),
                status: self.watcher.health_check().await,
            },
            WorkerHealth {
                name: self.reconciler.name().to_owned(),
                status: self.reconciler.health_check().await,
            },
        ];

        let status = aggregate_status(&workers);
        let uptime_secs = self.start_time.elapsed().as_secs();

        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(metric_names::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status,
            uptime_secs,
            workers,
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &OndemandConfig {
        &self.config
    }

    fn cleanup_pid_file(&self) {
        if !self.config.general.pid_file.is_empty() {
            remove_pid_file(Path::new(&self.config.general.pid_file));
        }
    }
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create the file
/// - Verifies the created file is a regular file
/// - Creates the parent directory with mode 0o700
///
/// # Errors
///
/// Returns an error if the PID file cannot be written.
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        file.set_permissions(permissions)?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove PID file"
        );
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}
