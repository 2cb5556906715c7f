//! Container reconciler for swag-ondemand.
//!
//! Keeps an in-memory table of containers opted in via the enable
//! label synchronized with the Docker daemon, starts containers whose
//! URL patterns match freshly observed accesses, and stops running
//! containers once they have been idle past the configured threshold.
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`ReconcilerError`)
//! - [`config`]: Reconciler configuration (`ReconcileConfig`, builder)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`tracker`]: Tracked-container table and decision logic
//! - [`reconciler`]: The worker (`Reconciler`, `ReconcilerBuilder`, `run_cycle`)
//!
//! # Architecture
//!
//! ```text
//! AccessSet --drain--> run_cycle
//!                         |
//!                  ContainerTracker (discover/prune/upsert)
//!                         |
//!                  DockerClient.start()/stop()
//! ```

pub mod config;
pub mod docker;
pub mod error;
pub mod reconciler;
pub mod tracker;

// --- Public API Re-exports ---

pub use config::{ReconcileConfig, ReconcileConfigBuilder};
pub use docker::{BollardDockerClient, DockerClient};
pub use error::ReconcilerError;
pub use reconciler::{CycleOutcome, Reconciler, ReconcilerBuilder, run_cycle};
pub use tracker::{ContainerTracker, TrackedContainer};
