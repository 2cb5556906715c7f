//! Reconciler error types.
//!
//! [`ReconcilerError`] covers everything the reconciler can fail at.
//! `From<ReconcilerError> for OndemandError` lets the daemon propagate
//! with `?`. At runtime almost all of these are contained: a failed
//! cycle is logged and the next cycle proceeds; only the startup ping
//! is allowed to take the process down.

use ondemand_core::error::{ConfigError, ContainerError, OndemandError, WorkerError};

/// Reconciler domain error.
#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    /// The Docker daemon is unreachable.
    #[error("docker connection error: {0}")]
    Connection(String),

    /// A Docker API call failed.
    #[error("docker api error: {0}")]
    Api(String),

    /// The named container does not exist.
    #[error("container not found: {0}")]
    NotFound(String),

    /// A start or stop action failed for one container.
    #[error("action failed for container '{container}': {reason}")]
    ActionFailed {
        /// Target container name.
        container: String,
        /// Failure reason.
        reason: String,
    },

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

impl From<ReconcilerError> for OndemandError {
    fn from(err: ReconcilerError) -> Self {
        match err {
            ReconcilerError::Connection(msg) => {
                OndemandError::Container(ContainerError::Connection(msg))
            }
            ReconcilerError::Api(msg) => OndemandError::Container(ContainerError::Api(msg)),
            ReconcilerError::NotFound(name) => {
                OndemandError::Container(ContainerError::NotFound(name))
            }
            ReconcilerError::ActionFailed { container, reason } => {
                OndemandError::Container(ContainerError::ActionFailed { container, reason })
            }
            ReconcilerError::Config { field, reason } => {
                OndemandError::Config(ConfigError::InvalidValue { field, reason })
            }
            ReconcilerError::Build(reason) => {
                OndemandError::Worker(WorkerError::InitFailed(reason))
            }
            ReconcilerError::AlreadyRunning => OndemandError::Worker(WorkerError::AlreadyRunning),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_failed_display() {
        let err = ReconcilerError::ActionFailed {
            container: "jellyfin".to_owned(),
            reason: "already started".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("jellyfin"));
        assert!(msg.contains("already started"));
    }

    #[test]
    fn converts_to_ondemand_error() {
        let err: OndemandError = ReconcilerError::Connection("refused".to_owned()).into();
        assert!(matches!(
            err,
            OndemandError::Container(ContainerError::Connection(_))
        ));

        let err: OndemandError = ReconcilerError::NotFound("gone".to_owned()).into();
        assert!(matches!(
            err,
            OndemandError::Container(ContainerError::NotFound(_))
        ));

        let err: OndemandError = ReconcilerError::Config {
            field: "poll_interval".to_owned(),
            reason: "zero".to_owned(),
        }
        .into();
        assert!(matches!(err, OndemandError::Config(_)));
    }
}
