//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, so
//! production code uses [`BollardDockerClient`] while tests drive the
//! reconciler with a mock. All calls operate on container *names*: the
//! enable label is attached to named compose services and the name is
//! the stable identity across stop/start.
//!
//! # Errors
//!
//! - **404**: converted to `ReconcilerError::NotFound`
//! - **Connection failures**: wrapped as `ReconcilerError::Connection`
//! - **Start/stop failures**: wrapped as `ReconcilerError::ActionFailed` --
//!   callers treat these as per-container, non-fatal

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use ondemand_core::types::ContainerSummary;

use crate::error::ReconcilerError;

/// Validate a container name before handing it to the Docker API.
///
/// Docker names are `[a-zA-Z0-9][a-zA-Z0-9_.-]*`. Anything else is
/// rejected up front rather than passed into a URL path.
fn validate_container_name(name: &str) -> Result<(), ReconcilerError> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ReconcilerError::Api(format!(
            "invalid container name: {name:?}"
        )))
    }
}

/// Trait abstracting the Docker operations the reconciler needs.
///
/// # Implementations
///
/// - [`BollardDockerClient`]: production implementation using `bollard`
/// - Test mocks: see `tests/` and the `#[cfg(test)]` mock in this module
pub trait DockerClient: Send + Sync + 'static {
    /// List all containers (including stopped ones) carrying the given
    /// `key=value` label.
    fn list_labeled(
        &self,
        label_filter: &str,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, ReconcilerError>> + Send;

    /// Start a container by name.
    fn start_container(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), ReconcilerError>> + Send;

    /// Stop a container by name (SIGTERM, then SIGKILL after the grace
    /// period).
    fn stop_container(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), ReconcilerError>> + Send;

    /// Check Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), ReconcilerError>> + Send;
}

/// Production Docker client backed by `bollard`.
///
/// Connects over the local Unix socket by default, or a configured
/// socket path. Connection construction is lazy; the first real check
/// is the reconciler's startup `ping()`.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connect using the platform default Docker socket.
    pub fn connect_local() -> Result<Self, ReconcilerError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            ReconcilerError::Connection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connect using a specific socket path.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, ReconcilerError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    ReconcilerError::Connection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_labeled(
        &self,
        label_filter: &str,
    ) -> Result<Vec<ContainerSummary>, ReconcilerError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            // Stopped containers must be listed too; starting them is
            // the whole point.
            all: true,
            filters: HashMap::from([("label".to_owned(), vec![label_filter.to_owned()])]),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ReconcilerError::Api(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let names = container.names.unwrap_or_default();
            let name = names
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();
            let status = container.state.unwrap_or_default();
            let labels = container.labels.unwrap_or_default();

            result.push(ContainerSummary {
                name,
                status,
                labels,
            });
        }

        Ok(result)
    }

    async fn start_container(&self, name: &str) -> Result<(), ReconcilerError> {
        validate_container_name(name)?;

        use bollard::container::StartContainerOptions;

        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| {
                if e.to_string().contains("404") {
                    ReconcilerError::NotFound(name.to_owned())
                } else {
                    ReconcilerError::ActionFailed {
                        container: name.to_owned(),
                        reason: format!("start failed: {e}"),
                    }
                }
            })
    }

    async fn stop_container(&self, name: &str) -> Result<(), ReconcilerError> {
        validate_container_name(name)?;

        use bollard::container::StopContainerOptions;

        self.docker
            .stop_container(name, Some(StopContainerOptions { t: 10 }))
            .await
            .map_err(|e| {
                if e.to_string().contains("404") {
                    ReconcilerError::NotFound(name.to_owned())
                } else {
                    ReconcilerError::ActionFailed {
                        container: name.to_owned(),
                        reason: format!("stop failed: {e}"),
                    }
                }
            })
    }

    async fn ping(&self) -> Result<(), ReconcilerError> {
        self.docker
            .ping()
            .await
            .map_err(|e| ReconcilerError::Connection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// Mock Docker client for unit tests.
///
/// Holds a mutable container list and records every issued action so
/// tests can assert on exactly which starts/stops were requested.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MockDockerClient {
    pub containers: std::sync::Mutex<Vec<ContainerSummary>>,
    pub started: std::sync::Mutex<Vec<String>>,
    pub stopped: std::sync::Mutex<Vec<String>>,
    pub fail_actions: bool,
    pub fail_ping: bool,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers(self, containers: Vec<ContainerSummary>) -> Self {
        *self.containers.lock().unwrap() = containers;
        self
    }

    pub fn with_failing_actions(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    pub fn set_containers(&self, containers: Vec<ContainerSummary>) {
        *self.containers.lock().unwrap() = containers;
    }

    pub fn started_names(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn stopped_names(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_labeled(
        &self,
        _label_filter: &str,
    ) -> Result<Vec<ContainerSummary>, ReconcilerError> {
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn start_container(&self, name: &str) -> Result<(), ReconcilerError> {
        if self.fail_actions {
            return Err(ReconcilerError::ActionFailed {
                container: name.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        self.started.lock().unwrap().push(name.to_owned());
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<(), ReconcilerError> {
        if self.fail_actions {
            return Err(ReconcilerError::ActionFailed {
                container: name.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        self.stopped.lock().unwrap().push(name.to_owned());
        Ok(())
    }

    async fn ping(&self) -> Result<(), ReconcilerError> {
        if self.fail_ping {
            return Err(ReconcilerError::Connection("mock ping failure".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, status: &str) -> ContainerSummary {
        ContainerSummary {
            name: name.to_owned(),
            status: status.to_owned(),
            labels: HashMap::new(),
        }
    }

    #[test]
    fn valid_container_names_pass() {
        for name in ["jellyfin", "media-server", "app_2", "a.b-c", "x"] {
            validate_container_name(name).unwrap();
        }
    }

    #[test]
    fn invalid_container_names_are_rejected() {
        for name in ["", "-leading-dash", "has space", "path/../traversal", "a\n"] {
            assert!(validate_container_name(name).is_err(), "accepted {name:?}");
        }
    }

    #[tokio::test]
    async fn mock_lists_containers() {
        let client = MockDockerClient::new()
            .with_containers(vec![sample("jellyfin", "running"), sample("komga", "exited")]);
        let list = client.list_labeled("swag_ondemand=enable").await.unwrap();
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn mock_records_actions() {
        let client = MockDockerClient::new().with_containers(vec![sample("komga", "exited")]);
        client.start_container("komga").await.unwrap();
        client.stop_container("komga").await.unwrap();
        assert_eq!(client.started_names(), vec!["komga"]);
        assert_eq!(client.stopped_names(), vec!["komga"]);
    }

    #[tokio::test]
    async fn mock_failing_actions() {
        let client = MockDockerClient::new().with_failing_actions();
        let result = client.start_container("komga").await;
        assert!(matches!(
            result,
            Err(ReconcilerError::ActionFailed { .. })
        ));
        assert!(client.started_names().is_empty());
    }

    #[tokio::test]
    async fn mock_ping() {
        let client = MockDockerClient::new();
        client.ping().await.unwrap();

        let failing = MockDockerClient {
            fail_ping: true,
            ..MockDockerClient::new()
        };
        assert!(matches!(
            failing.ping().await,
            Err(ReconcilerError::Connection(_))
        ));
    }

    #[test]
    fn docker_client_impls_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<MockDockerClient>();
        assert_send_sync::<BollardDockerClient>();
    }
}
