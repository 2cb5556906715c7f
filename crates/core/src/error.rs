//! Error taxonomy for swag-ondemand.
//!
//! Three classes of failure exist in this system: transient I/O faults
//! (retried in place, never propagated), per-container driver faults
//! (logged and skipped), and initialization faults (propagated to the
//! daemon, which exits non-zero). Only the last class flows through
//! these types; the first two are contained inside the worker loops.

/// Top-level error type for swag-ondemand.
#[derive(Debug, thiserror::Error)]
pub enum OndemandError {
    /// Configuration loading or validation failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Worker lifecycle violation (double start, failed spawn, ...).
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Container runtime driver failure.
    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    /// Plain I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// TOML parsing failed.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds an out-of-range or malformed value.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Worker lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// `start()` called while the worker is already running.
    #[error("worker already running")]
    AlreadyRunning,

    /// Worker could not be initialized.
    #[error("worker init failed: {0}")]
    InitFailed(String),

    /// Background task panicked or could not be joined.
    #[error("worker task join failed: {0}")]
    TaskJoin(String),
}

/// Container runtime driver errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The Docker daemon is unreachable.
    #[error("docker connection failed: {0}")]
    Connection(String),

    /// A Docker API call failed.
    #[error("docker api error: {0}")]
    Api(String),

    /// The named container does not exist.
    #[error("container not found: {0}")]
    NotFound(String),

    /// A start or stop action failed for one container.
    #[error("action failed for container '{container}': {reason}")]
    ActionFailed { container: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "reconciler.poll_interval_secs".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("reconciler.poll_interval_secs"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn worker_error_display() {
        assert_eq!(
            WorkerError::AlreadyRunning.to_string(),
            "worker already running"
        );
        assert!(
            WorkerError::InitFailed("no access set".to_owned())
                .to_string()
                .contains("no access set")
        );
    }

    #[test]
    fn container_error_display() {
        let err = ContainerError::ActionFailed {
            container: "jellyfin".to_owned(),
            reason: "already stopped".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("jellyfin"));
        assert!(msg.contains("already stopped"));
    }

    #[test]
    fn sub_errors_convert_to_top_level() {
        let err: OndemandError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, OndemandError::Config(_)));

        let err: OndemandError = WorkerError::AlreadyRunning.into();
        assert!(matches!(err, OndemandError::Worker(_)));

        let err: OndemandError = ContainerError::Connection("refused".to_owned()).into();
        assert!(matches!(err, OndemandError::Container(_)));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: OndemandError = io.into();
        assert!(matches!(err, OndemandError::Io(_)));
    }
}
