//! Watcher configuration.
//!
//! [`WatcherConfig`] derives from the `[log_watch]` section of the
//! core config and adds internal tuning fields the daemon does not
//! expose.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::LogWatchError;

/// Upper bound for a single log line; longer lines are dropped.
const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Log watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Path of the access log to follow.
    pub access_log_path: PathBuf,
    /// Sleep between read attempts at end-of-file.
    pub poll_interval: Duration,
    /// Sleep before retrying after an I/O error or a missing file.
    pub retry_delay: Duration,
    /// Maximum accepted line length in bytes.
    pub max_line_length: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            access_log_path: PathBuf::from("/config/log/nginx/access.log"),
            poll_interval: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl WatcherConfig {
    /// Build from the core `[log_watch]` section.
    ///
    /// Internal tuning fields keep their defaults.
    pub fn from_core(core: &ondemand_core::config::LogWatchConfig) -> Self {
        Self {
            access_log_path: PathBuf::from(&core.access_log_path),
            poll_interval: Duration::from_secs_f64(core.poll_interval_secs),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), LogWatchError> {
        if self.access_log_path.as_os_str().is_empty() {
            return Err(LogWatchError::Config {
                field: "access_log_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(LogWatchError::Config {
                field: "poll_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.max_line_length == 0 {
            return Err(LogWatchError::Config {
                field: "max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

/// Builder for [`WatcherConfig`].
#[derive(Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the access log path.
    pub fn access_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.access_log_path = path.into();
        self
    }

    /// Set the end-of-file poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the error retry delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the maximum accepted line length.
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.config.max_line_length = max;
        self
    }

    /// Validate and produce the config.
    pub fn build(self) -> Result<WatcherConfig, LogWatchError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
