//! Core building blocks shared by every swag-ondemand crate.
//!
//! # Module Structure
//!
//! - [`error`]: Error taxonomy (`OndemandError` and domain sub-errors)
//! - [`config`]: `ondemand.toml` parsing, env overrides, validation
//! - [`types`]: Domain types (`ContainerSummary`)
//! - [`access`]: Thread-safe accumulator for observed URLs (`AccessSet`)
//! - [`worker`]: Worker lifecycle trait (`Worker`, `HealthStatus`)
//! - [`metrics`]: Metric name constants and descriptions
//!
//! # Architecture
//!
//! ```text
//! access log --tail--> LogWatcher --record--> AccessSet
//!                                                |
//!                                         drain_combined()
//!                                                |
//! docker <--start/stop-- Reconciler <------------+
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;
pub mod worker;

// --- Public API Re-exports ---

pub use access::AccessSet;
pub use config::OndemandConfig;
pub use error::{ConfigError, ContainerError, OndemandError, WorkerError};
pub use types::ContainerSummary;
pub use worker::{HealthStatus, Worker};
