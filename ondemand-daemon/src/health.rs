//! Aggregated health check reporting.
//!
//! The orchestrator polls each worker's `health_check()` and produces
//! a unified [`DaemonHealth`] report. The overall daemon status is the
//! worst status among all workers.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use serde::Serialize;

use ondemand_core::worker::HealthStatus;

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall daemon health status (worst of all workers).
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Per-worker health reports.
    pub workers: Vec<WorkerHealth>,
}

/// Health status for a single worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerHealth {
    /// Worker name (e.g., "log-watch", "reconciler").
    pub name: String,
    /// Current health status of the worker.
    pub status: HealthStatus,
}

/// Aggregate multiple worker health statuses into a single status.
///
/// Returns the worst status found: Unhealthy > Degraded > Healthy.
pub fn aggregate_status(workers: &[WorkerHealth]) -> HealthStatus {
    let mut worst = HealthStatus::Healthy;
    let mut reasons = Vec::new();

    for worker in workers {
        match &worker.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                if !worst.is_unhealthy() {
                    reasons.push(format!("{}: {}", worker.name, reason));
                    worst = HealthStatus::Degraded(String::new());
                }
            }
            HealthStatus::Unhealthy(reason) => {
                reasons.push(format!("{}: {}", worker.name, reason));
                worst = HealthStatus::Unhealthy(String::new());
            }
        }
    }

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons.join("; ")),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons.join("; ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(name: &str, status: HealthStatus) -> WorkerHealth {
        WorkerHealth {
            name: name.to_owned(),
            status,
        }
    }

    #[test]
    fn all_healthy_is_healthy() {
        let workers = vec![
            worker("log-watch", HealthStatus::Healthy),
            worker("reconciler", HealthStatus::Healthy),
        ];
        assert_eq!(aggregate_status(&workers), HealthStatus::Healthy);
    }

    #[test]
    fn degraded_dominates_healthy() {
        let workers = vec![
            worker("log-watch", HealthStatus::Degraded("log missing".to_owned())),
            worker("reconciler", HealthStatus::Healthy),
        ];
        let status = aggregate_status(&workers);
        assert_eq!(
            status,
            HealthStatus::Degraded("log-watch: log missing".to_owned())
        );
    }

    #[test]
    fn unhealthy_dominates_degraded() {
        let workers = vec![
            worker("log-watch", HealthStatus::Degraded("log missing".to_owned())),
            worker("reconciler", HealthStatus::Unhealthy("task exited".to_owned())),
        ];
        let status = aggregate_status(&workers);
        assert!(status.is_unhealthy());
        assert_eq!(
            status,
            HealthStatus::Unhealthy("reconciler: task exited".to_owned())
        );
    }

    #[test]
    fn multiple_unhealthy_reasons_are_joined() {
        let workers = vec![
            worker("log-watch", HealthStatus::Unhealthy("a".to_owned())),
            worker("reconciler", HealthStatus::Unhealthy("b".to_owned())),
        ];
        assert_eq!(
            aggregate_status(&workers),
            HealthStatus::Unhealthy("log-watch: a; reconciler: b".to_owned())
        );
    }

    #[test]
    fn empty_worker_list_is_healthy() {
        assert_eq!(aggregate_status(&[]), HealthStatus::Healthy);
    }

    #[test]
    fn daemon_health_serializes() {
        let health = DaemonHealth {
            status: HealthStatus::Healthy,
            uptime_secs: 42,
            workers: vec![worker("log-watch", HealthStatus::Healthy)],
        };
        let json = serde_json::to_string(&health).unwrap();
        assert!(json.contains("uptime_secs"));
        assert!(json.contains("log-watch"));
    }
}
