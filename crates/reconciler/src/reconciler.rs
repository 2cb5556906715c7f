//! The reconciler worker -- the periodic cycle that keeps container
//! state in line with observed traffic.
//!
//! [`run_cycle`] is one full pass: discover labeled containers, sync
//! the tracker, drain the access set, start matched stopped containers,
//! stop idle running ones. [`Reconciler`] wraps it in the core
//! [`Worker`] contract, running one cycle per poll interval until
//! cancelled. A failed cycle is logged and the next one proceeds; only
//! the startup connectivity check is fatal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ondemand_core::AccessSet;
use ondemand_core::error::OndemandError;
use ondemand_core::metrics as metric_names;
use ondemand_core::worker::{HealthStatus, Worker};

use crate::config::ReconcileConfig;
use crate::docker::DockerClient;
use crate::error::ReconcilerError;
use crate::tracker::ContainerTracker;

/// What one reconciliation cycle did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Containers found in discovery.
    pub discovered: usize,
    /// Containers started this cycle.
    pub started: Vec<String>,
    /// Containers stopped this cycle.
    pub stopped: Vec<String>,
}

/// Run one reconciliation cycle against the given Docker client.
///
/// Discovery failure aborts the cycle (there is nothing sound to act
/// on). Per-container start/stop failures are logged and skipped; the
/// rest of the batch still proceeds.
pub async fn run_cycle<D: DockerClient>(
    config: &ReconcileConfig,
    docker: &D,
    access_set: &AccessSet,
    tracker: &mut ContainerTracker,
    now: Instant,
) -> Result<CycleOutcome, ReconcilerError> {
    let listing = docker.list_labeled(&config.label_filter()).await?;
    tracker.sync(&listing, &config.urls_label, now);
    gauge!(metric_names::RECONCILER_TRACKED_CONTAINERS).set(tracker.len() as f64);

    let mut outcome = CycleOutcome {
        discovered: listing.len(),
        ..CycleOutcome::default()
    };

    let combined = access_set.drain_combined();
    if !combined.is_empty() {
        debug!(urls = %combined, "drained access batch");
        for name in tracker.record_matches(&combined, now) {
            match docker.start_container(&name).await {
                Ok(()) => {
                    info!(container = %name, "started container on access");
                    tracker.mark_running(&name);
                    counter!(
                        metric_names::RECONCILER_STARTS_TOTAL,
                        metric_names::LABEL_CONTAINER => name.clone()
                    )
                    .increment(1);
                    outcome.started.push(name);
                }
                Err(e) => {
                    warn!(container = %name, error = %e, "failed to start container");
                }
            }
        }
    }

    for name in tracker.stop_candidates(config.stop_threshold, now) {
        match docker.stop_container(&name).await {
            Ok(()) => {
                info!(
                    container = %name,
                    idle_secs = config.stop_threshold.as_secs(),
                    "stopped idle container"
                );
                counter!(
                    metric_names::RECONCILER_STOPS_TOTAL,
                    metric_names::LABEL_CONTAINER => name.clone()
                )
                .increment(1);
                outcome.stopped.push(name);
            }
            Err(e) => {
                warn!(container = %name, error = %e, "failed to stop container");
            }
        }
    }

    counter!(metric_names::RECONCILER_CYCLES_TOTAL).increment(1);
    Ok(outcome)
}

/// Reconciler execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcilerState {
    Initialized,
    Running,
    Stopped,
}

/// Container reconciler worker.
///
/// # Example
/// ```ignore
/// let docker = Arc::new(BollardDockerClient::connect_local()?);
/// let mut reconciler = ReconcilerBuilder::new()
///     .config(ReconcileConfig::from_core(&config.reconciler))
///     .docker(docker)
///     .access_set(Arc::clone(&access_set))
///     .build()?;
/// reconciler.start().await?;
/// ```
pub struct Reconciler<D: DockerClient> {
    config: ReconcileConfig,
    docker: Arc<D>,
    access_set: Arc<AccessSet>,
    state: ReconcilerState,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    cycles: Arc<AtomicU64>,
    starts: Arc<AtomicU64>,
    stops: Arc<AtomicU64>,
    last_cycle_ok: Arc<AtomicBool>,
}

impl<D: DockerClient> Reconciler<D> {
    /// Total completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Total containers started.
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Total containers stopped.
    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::Relaxed)
    }
}

impl<D: DockerClient> Worker for Reconciler<D> {
    fn name(&self) -> &'static str {
        "reconciler"
    }

    async fn start(&mut self) -> Result<(), OndemandError> {
        if self.state == ReconcilerState::Running {
            return Err(ReconcilerError::AlreadyRunning.into());
        }

        // Hard requirement: without Docker the daemon has no purpose,
        // so an unreachable daemon at startup is fatal.
        self.docker.ping().await.map_err(OndemandError::from)?;
        info!(
            label = %self.config.label_filter(),
            interval_secs = self.config.poll_interval.as_secs_f64(),
            "starting reconciler"
        );

        self.cancel = CancellationToken::new();
        let config = self.config.clone();
        let docker = Arc::clone(&self.docker);
        let access_set = Arc::clone(&self.access_set);
        let cycles = Arc::clone(&self.cycles);
        let starts = Arc::clone(&self.starts);
        let stops = Arc::clone(&self.stops);
        let last_cycle_ok = Arc::clone(&self.last_cycle_ok);
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(run_loop(
            config,
            docker,
            access_set,
            CycleCounters {
                cycles,
                starts,
                stops,
                last_cycle_ok,
            },
            cancel,
        )));
        self.state = ReconcilerState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), OndemandError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        info!("stopping reconciler");
        self.cancel.cancel();
        task.await
            .map_err(|e| ondemand_core::error::WorkerError::TaskJoin(e.to_string()))?;
        self.state = ReconcilerState::Stopped;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ReconcilerState::Initialized => HealthStatus::Degraded("not started".to_owned()),
            ReconcilerState::Stopped => HealthStatus::Degraded("stopped".to_owned()),
            ReconcilerState::Running => match &self.task {
                Some(task) if !task.is_finished() => {
                    if self.last_cycle_ok.load(Ordering::Relaxed) {
                        HealthStatus::Healthy
                    } else {
                        HealthStatus::Degraded("last reconciliation cycle failed".to_owned())
                    }
                }
                _ => HealthStatus::Unhealthy("background task exited".to_owned()),
            },
        }
    }
}

/// Builder for [`Reconciler`].
pub struct ReconcilerBuilder<D: DockerClient> {
    config: ReconcileConfig,
    docker: Option<Arc<D>>,
    access_set: Option<Arc<AccessSet>>,
}

impl<D: DockerClient> Default for ReconcilerBuilder<D> {
    fn default() -> Self {
        Self {
            config: ReconcileConfig::default(),
            docker: None,
            access_set: None,
        }
    }
}

impl<D: DockerClient> ReconcilerBuilder<D> {
    /// Create a new builder with a default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reconciler configuration.
    pub fn config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the Docker client.
    pub fn docker(mut self, docker: Arc<D>) -> Self {
        self.docker = Some(docker);
        self
    }

    /// Set the shared access set the reconciler drains.
    pub fn access_set(mut self, access_set: Arc<AccessSet>) -> Self {
        self.access_set = Some(access_set);
        self
    }

    /// Validate and build the reconciler.
    pub fn build(self) -> Result<Reconciler<D>, ReconcilerError> {
        self.config.validate()?;
        let docker = self
            .docker
            .ok_or_else(|| ReconcilerError::Build("docker client not provided".to_owned()))?;
        let access_set = self
            .access_set
            .ok_or_else(|| ReconcilerError::Build("access set not provided".to_owned()))?;
        Ok(Reconciler {
            config: self.config,
            docker,
            access_set,
            state: ReconcilerState::Initialized,
            cancel: CancellationToken::new(),
            task: None,
            cycles: Arc::new(AtomicU64::new(0)),
            starts: Arc::new(AtomicU64::new(0)),
            stops: Arc::new(AtomicU64::new(0)),
            last_cycle_ok: Arc::new(AtomicBool::new(true)),
        })
    }
}

/// Shared cycle statistics between the worker handle and its task.
struct CycleCounters {
    cycles: Arc<AtomicU64>,
    starts: Arc<AtomicU64>,
    stops: Arc<AtomicU64>,
    last_cycle_ok: Arc<AtomicBool>,
}

async fn run_loop<D: DockerClient>(
    config: ReconcileConfig,
    docker: Arc<D>,
    access_set: Arc<AccessSet>,
    counters: CycleCounters,
    cancel: CancellationToken,
) {
    let mut tracker = ContainerTracker::new();
    let mut interval = tokio::time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        match run_cycle(&config, docker.as_ref(), &access_set, &mut tracker, Instant::now()).await {
            Ok(outcome) => {
                counters.cycles.fetch_add(1, Ordering::Relaxed);
                counters
                    .starts
                    .fetch_add(outcome.started.len() as u64, Ordering::Relaxed);
                counters
                    .stops
                    .fetch_add(outcome.stopped.len() as u64, Ordering::Relaxed);
                counters.last_cycle_ok.store(true, Ordering::Relaxed);
            }
            Err(e) => {
                // Transient Docker trouble; the next tick retries.
                warn!(error = %e, "reconciliation cycle failed");
                counters.last_cycle_ok.store(false, Ordering::Relaxed);
            }
        }
    }
    info!("reconciler exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use ondemand_core::types::ContainerSummary;

    use crate::docker::MockDockerClient;

    fn summary(name: &str, status: &str, urls: Option<&str>) -> ContainerSummary {
        let mut labels = HashMap::new();
        labels.insert("swag_ondemand".to_owned(), "enable".to_owned());
        if let Some(urls) = urls {
            labels.insert("swag_ondemand_urls".to_owned(), urls.to_owned());
        }
        ContainerSummary {
            name: name.to_owned(),
            status: status.to_owned(),
            labels,
        }
    }

    fn config(stop_threshold: Duration) -> ReconcileConfig {
        ReconcileConfig {
            stop_threshold,
            ..ReconcileConfig::default()
        }
    }

    #[tokio::test]
    async fn cycle_starts_matched_stopped_container() {
        let docker = MockDockerClient::new()
            .with_containers(vec![summary("komga", "exited", None)]);
        let access_set = AccessSet::new();
        access_set.record("https://komga.example.com/");
        let mut tracker = ContainerTracker::new();

        let outcome = run_cycle(
            &config(Duration::from_secs(600)),
            &docker,
            &access_set,
            &mut tracker,
            Instant::now(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.discovered, 1);
        assert_eq!(outcome.started, vec!["komga"]);
        assert_eq!(docker.started_names(), vec!["komga"]);
        assert!(outcome.stopped.is_empty());
    }

    #[tokio::test]
    async fn cycle_does_not_restart_running_container() {
        let docker = MockDockerClient::new()
            .with_containers(vec![summary("jellyfin", "running", None)]);
        let access_set = AccessSet::new();
        access_set.record("https://jellyfin.example.com/web/");
        let mut tracker = ContainerTracker::new();

        let outcome = run_cycle(
            &config(Duration::from_secs(600)),
            &docker,
            &access_set,
            &mut tracker,
            Instant::now(),
        )
        .await
        .unwrap();

        assert!(outcome.started.is_empty());
        assert!(docker.started_names().is_empty());
    }

    #[tokio::test]
    async fn cycle_stops_idle_running_container() {
        let docker = MockDockerClient::new()
            .with_containers(vec![summary("jellyfin", "running", None)]);
        let access_set = AccessSet::new();
        let mut tracker = ContainerTracker::new();
        let threshold = Duration::from_secs(5);

        let t0 = Instant::now();
        run_cycle(&config(threshold), &docker, &access_set, &mut tracker, t0)
            .await
            .unwrap();
        assert!(docker.stopped_names().is_empty());

        let t6 = t0 + Duration::from_secs(6);
        let outcome = run_cycle(&config(threshold), &docker, &access_set, &mut tracker, t6)
            .await
            .unwrap();
        assert_eq!(outcome.stopped, vec!["jellyfin"]);
        assert_eq!(docker.stopped_names(), vec!["jellyfin"]);
    }

    #[tokio::test]
    async fn cycle_never_stops_exited_container() {
        let docker = MockDockerClient::new()
            .with_containers(vec![summary("komga", "exited", None)]);
        let access_set = AccessSet::new();
        let mut tracker = ContainerTracker::new();
        let threshold = Duration::from_secs(5);

        let t0 = Instant::now();
        run_cycle(&config(threshold), &docker, &access_set, &mut tracker, t0)
            .await
            .unwrap();
        let t60 = t0 + Duration::from_secs(60);
        let outcome = run_cycle(&config(threshold), &docker, &access_set, &mut tracker, t60)
            .await
            .unwrap();
        assert!(outcome.stopped.is_empty());
        assert!(docker.stopped_names().is_empty());
    }

    #[tokio::test]
    async fn start_failure_skips_container_and_cycle_succeeds() {
        let docker = MockDockerClient::new()
            .with_containers(vec![summary("komga", "exited", None)])
            .with_failing_actions();
        let access_set = AccessSet::new();
        access_set.record("https://komga.example.com/");
        let mut tracker = ContainerTracker::new();

        let outcome = run_cycle(
            &config(Duration::from_secs(600)),
            &docker,
            &access_set,
            &mut tracker,
            Instant::now(),
        )
        .await
        .unwrap();

        assert!(outcome.started.is_empty());
        // failed start leaves the container startable next cycle
        assert!(!tracker.get("komga").unwrap().is_running());
    }

    #[tokio::test]
    async fn worker_start_fails_when_docker_unreachable() {
        let docker = Arc::new(MockDockerClient {
            fail_ping: true,
            ..MockDockerClient::new()
        });
        let mut reconciler = ReconcilerBuilder::new()
            .docker(docker)
            .access_set(Arc::new(AccessSet::new()))
            .build()
            .unwrap();

        assert!(reconciler.start().await.is_err());
        assert!(matches!(
            reconciler.health_check().await,
            HealthStatus::Degraded(_)
        ));
    }

    #[tokio::test]
    async fn worker_lifecycle() {
        let docker = Arc::new(MockDockerClient::new());
        let mut reconciler = ReconcilerBuilder::new()
            .config(ReconcileConfig {
                poll_interval: Duration::from_millis(20),
                ..ReconcileConfig::default()
            })
            .docker(docker)
            .access_set(Arc::new(AccessSet::new()))
            .build()
            .unwrap();

        reconciler.start().await.unwrap();
        assert!(reconciler.health_check().await.is_healthy());
        assert!(reconciler.start().await.is_err());

        reconciler.stop().await.unwrap();
        assert!(matches!(
            reconciler.health_check().await,
            HealthStatus::Degraded(_)
        ));
        // stop after stop is a no-op
        reconciler.stop().await.unwrap();
    }

    #[test]
    fn builder_requires_docker_and_access_set() {
        let result = ReconcilerBuilder::<MockDockerClient>::new().build();
        assert!(matches!(result, Err(ReconcilerError::Build(_))));

        let result = ReconcilerBuilder::<MockDockerClient>::new()
            .docker(Arc::new(MockDockerClient::new()))
            .build();
        assert!(matches!(result, Err(ReconcilerError::Build(_))));
    }
}
