//! Access-log watcher for swag-ondemand.
//!
//! Follows the reverse proxy's access log the way `tail -f` does,
//! survives log rotation, extracts accessed URLs, and records them into
//! the shared [`AccessSet`](ondemand_core::AccessSet).
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`LogWatchError`)
//! - [`config`]: Watcher configuration (`WatcherConfig`, builder)
//! - [`follow`]: Rotation-aware file follower (`LogFollower`)
//! - [`parse`]: Access-log line filtering and URL extraction
//! - [`watcher`]: The worker (`LogWatcher`, `LogWatcherBuilder`)

pub mod config;
pub mod error;
pub mod follow;
pub mod parse;
pub mod watcher;

// --- Public API Re-exports ---

pub use config::{WatcherConfig, WatcherConfigBuilder};
pub use error::LogWatchError;
pub use follow::LogFollower;
pub use parse::extract_url;
pub use watcher::{LogWatcher, LogWatcherBuilder};
