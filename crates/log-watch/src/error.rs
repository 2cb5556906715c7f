//! Log watcher error types.
//!
//! [`LogWatchError`] covers the failures that escape the watcher's
//! retry loops: configuration problems and lifecycle violations.
//! Transient read errors never surface here; the tail loop logs them
//! and retries in place.

use ondemand_core::error::{ConfigError, OndemandError, WorkerError};

/// Log watcher domain error.
#[derive(Debug, thiserror::Error)]
pub enum LogWatchError {
    /// Configuration error.
    #[error("config error: {field}: {reason}")]
    Config {
        /// Offending field name.
        field: String,
        /// Failure reason.
        reason: String,
    },

    /// Builder was missing a required component.
    #[error("build error: {0}")]
    Build(String),

    /// Worker lifecycle violation.
    #[error("worker already running")]
    AlreadyRunning,
}

impl From<LogWatchError> for OndemandError {
    fn from(err: LogWatchError) -> Self {
        match err {
            LogWatchError::Config { field, reason } => {
                OndemandError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogWatchError::Build(reason) => {
                OndemandError::Worker(WorkerError::InitFailed(reason))
            }
            LogWatchError::AlreadyRunning => OndemandError::Worker(WorkerError::AlreadyRunning),
        }
    }
}
