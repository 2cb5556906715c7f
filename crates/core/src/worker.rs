//! Worker lifecycle trait -- the extension point every long-running
//! module implements.
//!
//! The daemon drives both workers (log watcher, reconciler) through
//! the same contract: `start()` spawns the background task, `stop()`
//! cancels it and waits for it to exit, `health_check()` reports
//! liveness. Workers run until cancelled; they never terminate on
//! their own short of a panic.

use std::fmt;
use std::future::Future;

use serde::Serialize;

use crate::error::OndemandError;

/// Health status reported by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Operating with reduced capability (e.g. Docker temporarily
    /// unreachable, log file missing).
    Degraded(String),
    /// Not operating (background task dead).
    Unhealthy(String),
}

impl HealthStatus {
    /// Whether the status is `Healthy`.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Whether the status is `Unhealthy`.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// Lifecycle contract for long-running modules.
///
/// # State transitions
///
/// ```text
/// Initialized -> start() -> Running -> stop() -> Stopped
/// ```
///
/// `start()` returns `WorkerError::AlreadyRunning` on a double start.
/// `stop()` on a non-running worker is a no-op. Implementations own a
/// `CancellationToken` that `stop()` triggers; the spawned task must
/// exit promptly once cancelled.
pub trait Worker: Send {
    /// Stable worker name for logs and health reports.
    fn name(&self) -> &'static str;

    /// Spawn the worker's background task.
    fn start(&mut self) -> impl Future<Output = Result<(), OndemandError>> + Send;

    /// Cancel the background task and wait for it to exit.
    fn stop(&mut self) -> impl Future<Output = Result<(), OndemandError>> + Send;

    /// Report current health.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
