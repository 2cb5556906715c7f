//! Shared access state -- the set of URLs observed since the last drain.
//!
//! [`AccessSet`] is the single rendezvous point between the log watcher
//! (producer) and the reconciler (consumer). The watcher records each
//! accessed URL; once per reconciliation cycle the reconciler atomically
//! takes and clears the whole set.
//!
//! # Concurrency
//!
//! The set is guarded by a `std::sync::Mutex`: both operations are
//! non-blocking and never await inside the critical section, so a
//! blocking mutex is the right primitive even though both callers run
//! on the tokio runtime. A URL recorded before a drain is guaranteed
//! visible to that drain; a URL recorded concurrently with a drain may
//! land in either the current or the next one.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Thread-safe accumulator of distinct accessed URLs.
///
/// Membership, not order, is what matters: the reconciler only tests
/// pattern containment against the drained combined string.
#[derive(Debug, Default)]
pub struct AccessSet {
    urls: Mutex<HashSet<String>>,
}

impl AccessSet {
    /// Create an empty access set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accessed URL. Idempotent (set semantics).
    pub fn record(&self, url: impl Into<String>) {
        self.lock().insert(url.into());
    }

    /// Atomically take all accumulated URLs as one comma-joined string
    /// and clear the set.
    ///
    /// Returns an empty string when nothing was recorded. A second
    /// drain immediately after the first always returns empty.
    pub fn drain_combined(&self) -> String {
        let mut urls = self.lock();
        let combined = urls
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        urls.clear();
        combined
    }

    /// Number of distinct URLs currently accumulated.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no URLs have been recorded since the last drain.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // A poisoned lock only means a panic elsewhere; the set itself
        // is always in a consistent state, so keep going.
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
