//! Domain types shared across modules.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Container status string reported by Docker for a running container.
///
/// Docker reports lifecycle state as a free-form string (`running`,
/// `exited`, `created`, ...). Only `running` carries meaning for the
/// start/stop decisions; everything else is treated as "not running".
pub const STATUS_RUNNING: &str = "running";

/// Snapshot of one container as reported by the runtime driver.
///
/// Produced by `DockerClient::list_labeled` each reconciliation cycle.
/// Carries the full label map so the reconciler can read the URL
/// pattern label without a second API round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Container name (unique per host, leading `/` stripped).
    pub name: String,
    /// Lifecycle status string (`running`, `exited`, ...).
    pub status: String,
    /// Container labels.
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    /// Whether the container is currently running.
    pub fn is_running(&self) -> bool {
        self.status == STATUS_RUNNING
    }

    /// Look up a label value by key.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

impl fmt::Display for ContainerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} status={}", self.name, self.status)
    }
}
