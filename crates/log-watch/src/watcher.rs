//! The log watcher worker -- ties the follower, the line filter, and
//! the shared access set together.
//!
//! [`LogWatcher`] implements the core [`Worker`] contract. `start()`
//! spawns a single tokio task that follows the access log forever:
//! lines are processed immediately while available; at end-of-file the
//! task sleeps one poll interval, then checks for rotation. Every I/O
//! failure is logged and retried after a short delay; the task exits
//! only on cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ondemand_core::AccessSet;
use ondemand_core::error::OndemandError;
use ondemand_core::metrics as metric_names;
use ondemand_core::worker::{HealthStatus, Worker};

use crate::config::WatcherConfig;
use crate::error::LogWatchError;
use crate::follow::LogFollower;
use crate::parse::extract_url;

/// Watcher execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatcherState {
    Initialized,
    Running,
    Stopped,
}

/// Access-log watcher worker.
///
/// # Example
/// ```ignore
/// let access_set = Arc::new(AccessSet::new());
/// let mut watcher = LogWatcherBuilder::new()
///     .config(WatcherConfig::from_core(&config.log_watch))
///     .access_set(Arc::clone(&access_set))
///     .build()?;
/// watcher.start().await?;
/// ```
pub struct LogWatcher {
    config: WatcherConfig,
    access_set: Arc<AccessSet>,
    state: WatcherState,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    lines_seen: Arc<AtomicU64>,
    urls_recorded: Arc<AtomicU64>,
}

impl LogWatcher {
    /// Total log lines read.
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen.load(Ordering::Relaxed)
    }

    /// Total URLs recorded into the access set.
    pub fn urls_recorded(&self) -> u64 {
        self.urls_recorded.load(Ordering::Relaxed)
    }

    /// Current state name for logs.
    pub fn state_name(&self) -> &'static str {
        match self.state {
            WatcherState::Initialized => "initialized",
            WatcherState::Running => "running",
            WatcherState::Stopped => "stopped",
        }
    }
}

impl Worker for LogWatcher {
    fn name(&self) -> &'static str {
        "log-watch"
    }

    async fn start(&mut self) -> Result<(), OndemandError> {
        if self.state == WatcherState::Running {
            return Err(LogWatchError::AlreadyRunning.into());
        }

        info!(path = %self.config.access_log_path.display(), "starting log watcher");

        self.cancel = CancellationToken::new();
        let config = self.config.clone();
        let access_set = Arc::clone(&self.access_set);
        let lines_seen = Arc::clone(&self.lines_seen);
        let urls_recorded = Arc::clone(&self.urls_recorded);
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(run_loop(
            config,
            access_set,
            lines_seen,
            urls_recorded,
            cancel,
        )));
        self.state = WatcherState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), OndemandError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        info!("stopping log watcher");
        self.cancel.cancel();
        task.await
            .map_err(|e| ondemand_core::error::WorkerError::TaskJoin(e.to_string()))?;
        self.state = WatcherState::Stopped;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            WatcherState::Initialized => HealthStatus::Degraded("not started".to_owned()),
            WatcherState::Stopped => HealthStatus::Degraded("stopped".to_owned()),
            WatcherState::Running => match &self.task {
                Some(task) if !task.is_finished() => HealthStatus::Healthy,
                _ => HealthStatus::Unhealthy("background task exited".to_owned()),
            },
        }
    }
}

/// Builder for [`LogWatcher`].
#[derive(Default)]
pub struct LogWatcherBuilder {
    config: WatcherConfig,
    access_set: Option<Arc<AccessSet>>,
}

impl LogWatcherBuilder {
    /// Create a new builder with a default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the watcher configuration.
    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the shared access set the watcher records into.
    pub fn access_set(mut self, access_set: Arc<AccessSet>) -> Self {
        self.access_set = Some(access_set);
        self
    }

    /// Validate and build the watcher.
    pub fn build(self) -> Result<LogWatcher, LogWatchError> {
        self.config.validate()?;
        let access_set = self
            .access_set
            .ok_or_else(|| LogWatchError::Build("access set not provided".to_owned()))?;
        Ok(LogWatcher {
            config: self.config,
            access_set,
            state: WatcherState::Initialized,
            cancel: CancellationToken::new(),
            task: None,
            lines_seen: Arc::new(AtomicU64::new(0)),
            urls_recorded: Arc::new(AtomicU64::new(0)),
        })
    }
}

async fn run_loop(
    config: WatcherConfig,
    access_set: Arc<AccessSet>,
    lines_seen: Arc<AtomicU64>,
    urls_recorded: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    loop {
        let Some(mut follower) = wait_for_file(&config, &cancel).await else {
            break;
        };

        match follow(
            &mut follower,
            &config,
            &access_set,
            &lines_seen,
            &urls_recorded,
            &cancel,
        )
        .await
        {
            Ok(()) => break, // cancelled
            Err(e) => {
                warn!(error = %e, "tail loop failed, reopening");
                if sleep_cancellable(config.retry_delay, &cancel).await {
                    break;
                }
            }
        }
    }
    info!("log watcher exited");
}

/// Wait until the access log can be opened. Returns `None` on cancel.
async fn wait_for_file(config: &WatcherConfig, cancel: &CancellationToken) -> Option<LogFollower> {
    loop {
        match LogFollower::open_end(&config.access_log_path, config.max_line_length).await {
            Ok(follower) => return Some(follower),
            Err(e) => {
                debug!(
                    path = %config.access_log_path.display(),
                    error = %e,
                    "access log not available yet"
                );
                if sleep_cancellable(config.retry_delay, cancel).await {
                    return None;
                }
            }
        }
    }
}

/// Follow the open log until cancelled. I/O errors propagate to the
/// outer loop, which reopens from scratch.
async fn follow(
    follower: &mut LogFollower,
    config: &WatcherConfig,
    access_set: &AccessSet,
    lines_seen: &AtomicU64,
    urls_recorded: &AtomicU64,
    cancel: &CancellationToken,
) -> std::io::Result<()> {
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        match follower.next_line().await? {
            Some(line) => {
                // A line is available: process it and read on without sleeping.
                lines_seen.fetch_add(1, Ordering::Relaxed);
                counter!(metric_names::LOG_WATCH_LINES_TOTAL).increment(1);
                if let Some(url) = extract_url(&line) {
                    access_set.record(url);
                    urls_recorded.fetch_add(1, Ordering::Relaxed);
                    counter!(metric_names::LOG_WATCH_URLS_RECORDED_TOTAL).increment(1);
                    debug!(url = url, "recorded access");
                }
            }
            None => {
                if sleep_cancellable(config.poll_interval, cancel).await {
                    return Ok(());
                }
                if follower.rotated().await? {
                    info!(path = %follower.path().display(), "log rotated, reopening");
                    follower.reopen().await?;
                    counter!(metric_names::LOG_WATCH_ROTATIONS_TOTAL).increment(1);
                }
            }
        }
    }
}

/// Sleep for `duration` unless cancelled first. Returns true on cancel.
async fn sleep_cancellable(duration: std::time::Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
