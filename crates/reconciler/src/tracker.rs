//! Tracked-container table and start/stop decision logic.
//!
//! [`ContainerTracker`] is the reconciler's in-memory model of every
//! opted-in container. It is purely synchronous and takes the current
//! [`Instant`] as a parameter, so decision logic is testable without a
//! Docker daemon or a wall clock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ondemand_core::types::{ContainerSummary, STATUS_RUNNING};
use tracing::{debug, info};

/// Per-container tracked state.
#[derive(Debug, Clone)]
pub struct TrackedContainer {
    /// Status string as last reported by Docker (`running`, `exited`, ...).
    pub status: String,
    /// URL prefix patterns that count as an access for this container.
    pub patterns: Vec<String>,
    /// When this container was last accessed (or first discovered).
    pub last_access: Instant,
}

impl TrackedContainer {
    /// Whether Docker last reported this container as running.
    pub fn is_running(&self) -> bool {
        self.status == STATUS_RUNNING
    }
}

/// Default URL patterns when the URLs label is absent: the container
/// name as a subdomain, both schemes.
fn default_patterns(name: &str) -> Vec<String> {
    vec![format!("https://{name}."), format!("http://{name}.")]
}

/// Parse the comma-separated URLs label into patterns, falling back to
/// the name-based defaults when the label is absent or empty.
fn patterns_for(container: &ContainerSummary, urls_label: &str) -> Vec<String> {
    let patterns: Vec<String> = container
        .label(urls_label)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    if patterns.is_empty() {
        default_patterns(&container.name)
    } else {
        patterns
    }
}

/// In-memory table of opted-in containers, keyed by name.
#[derive(Debug, Default)]
pub struct ContainerTracker {
    containers: HashMap<String, TrackedContainer>,
}

impl ContainerTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked containers.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether the tracker is empty.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Look up a tracked container by name.
    pub fn get(&self, name: &str) -> Option<&TrackedContainer> {
        self.containers.get(name)
    }

    /// Synchronize the table with a fresh discovery listing.
    ///
    /// Containers that disappeared from the listing (removed, or label
    /// dropped) are pruned. New containers are inserted with
    /// `last_access = now`, which grants a freshly discovered container
    /// one full idle threshold before it becomes a stop candidate.
    /// Existing entries keep their `last_access` and get their status
    /// and patterns refreshed.
    pub fn sync(&mut self, listing: &[ContainerSummary], urls_label: &str, now: Instant) {
        self.containers.retain(|name, _| {
            let keep = listing.iter().any(|c| c.name == *name);
            if !keep {
                info!(container = %name, "stopped monitoring container");
            }
            keep
        });

        for summary in listing {
            if summary.name.is_empty() {
                continue;
            }
            let patterns = patterns_for(summary, urls_label);
            match self.containers.get_mut(&summary.name) {
                Some(entry) => {
                    entry.status = summary.status.clone();
                    entry.patterns = patterns;
                }
                None => {
                    info!(
                        container = %summary.name,
                        status = %summary.status,
                        patterns = ?patterns,
                        "started monitoring container"
                    );
                    self.containers.insert(
                        summary.name.clone(),
                        TrackedContainer {
                            status: summary.status.clone(),
                            patterns,
                            last_access: now,
                        },
                    );
                }
            }
        }
    }

    /// Match a batch of drained accesses against every tracked
    /// container, refreshing `last_access` for each match.
    ///
    /// `combined` is the comma-joined URL batch from the access set; a
    /// container matches when any of its patterns occurs as a substring.
    /// Returns the names of matched containers that are *not* currently
    /// running, i.e. the start candidates.
    pub fn record_matches(&mut self, combined: &str, now: Instant) -> Vec<String> {
        let mut to_start = Vec::new();
        for (name, entry) in &mut self.containers {
            let matched = entry.patterns.iter().any(|p| combined.contains(p.as_str()));
            if !matched {
                continue;
            }
            entry.last_access = now;
            if entry.is_running() {
                debug!(container = %name, "access refreshed running container");
            } else {
                to_start.push(name.clone());
            }
        }
        to_start.sort();
        to_start
    }

    /// Names of running containers whose idle time has reached the
    /// threshold.
    pub fn stop_candidates(&self, threshold: Duration, now: Instant) -> Vec<String> {
        let mut candidates: Vec<String> = self
            .containers
            .iter()
            .filter(|(_, entry)| {
                entry.is_running() && now.duration_since(entry.last_access) >= threshold
            })
            .map(|(name, _)| name.clone())
            .collect();
        candidates.sort();
        candidates
    }

    /// Mark a container as running after a successful start, so a
    /// second start is not issued before the next discovery.
    pub fn mark_running(&mut self, name: &str) {
        if let Some(entry) = self.containers.get_mut(name) {
            entry.status = STATUS_RUNNING.to_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    const URLS_LABEL: &str = "swag_ondemand_urls";

    #[test]
    fn sync_inserts_and_prunes() {
        let t0 = Instant::now();
        let mut tracker = ContainerTracker::new();

        tracker.sync(
            &[summary("jellyfin", "running", None), summary("komga", "exited", None)],
            URLS_LABEL,
            t0,
        );
        assert_eq!(tracker.len(), 2);

        // komga drops its label
        tracker.sync(&[summary("jellyfin", "running", None)], URLS_LABEL, t0);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.get("komga").is_none());
    }

    #[test]
    fn sync_preserves_last_access_for_existing() {
        let t0 = Instant::now();
        let t5 = t0 + Duration::from_secs(5);
        let mut tracker = ContainerTracker::new();

        tracker.sync(&[summary("jellyfin", "running", None)], URLS_LABEL, t0);
        tracker.sync(&[summary("jellyfin", "running", None)], URLS_LABEL, t5);

        assert_eq!(tracker.get("jellyfin").unwrap().last_access, t0);
    }

    #[test]
    fn sync_refreshes_status_and_patterns() {
        let t0 = Instant::now();
        let mut tracker = ContainerTracker::new();

        tracker.sync(&[summary("komga", "exited", None)], URLS_LABEL, t0);
        tracker.sync(
            &[summary("komga", "running", Some("https://books."))],
            URLS_LABEL,
            t0,
        );

        let entry = tracker.get("komga").unwrap();
        assert!(entry.is_running());
        assert_eq!(entry.patterns, vec!["https://books."]);
    }

    #[test]
    fn default_patterns_use_container_name() {
        let t0 = Instant::now();
        let mut tracker = ContainerTracker::new();
        tracker.sync(&[summary("jellyfin", "exited", None)], URLS_LABEL, t0);

        let entry = tracker.get("jellyfin").unwrap();
        assert_eq!(
            entry.patterns,
            vec!["https://jellyfin.", "http://jellyfin."]
        );
    }

    #[test]
    fn urls_label_splits_and_trims() {
        let t0 = Instant::now();
        let mut tracker = ContainerTracker::new();
        tracker.sync(
            &[summary("komga", "exited", Some(" https://books. , http://comics. ,,"))],
            URLS_LABEL,
            t0,
        );

        let entry = tracker.get("komga").unwrap();
        assert_eq!(entry.patterns, vec!["https://books.", "http://comics."]);
    }

    #[test]
    fn empty_urls_label_falls_back_to_defaults() {
        let t0 = Instant::now();
        let mut tracker = ContainerTracker::new();
        tracker.sync(&[summary("komga", "exited", Some("  ,  "))], URLS_LABEL, t0);

        let entry = tracker.get("komga").unwrap();
        assert_eq!(entry.patterns, vec!["https://komga.", "http://komga."]);
    }

    #[test]
    fn record_matches_returns_stopped_matches_only() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        let mut tracker = ContainerTracker::new();
        tracker.sync(
            &[
                summary("jellyfin", "running", None),
                summary("komga", "exited", None),
                summary("sonarr", "exited", None),
            ],
            URLS_LABEL,
            t0,
        );

        let combined = "https://jellyfin.example.com/web/,https://komga.example.com/";
        let to_start = tracker.record_matches(combined, t1);

        assert_eq!(to_start, vec!["komga"]);
        // matched containers got refreshed, running or not
        assert_eq!(tracker.get("jellyfin").unwrap().last_access, t1);
        assert_eq!(tracker.get("komga").unwrap().last_access, t1);
        // unmatched container untouched
        assert_eq!(tracker.get("sonarr").unwrap().last_access, t0);
    }

    #[test]
    fn stop_candidates_respect_threshold() {
        let t0 = Instant::now();
        let threshold = Duration::from_secs(600);
        let mut tracker = ContainerTracker::new();
        tracker.sync(
            &[
                summary("jellyfin", "running", None),
                summary("komga", "exited", None),
            ],
            URLS_LABEL,
            t0,
        );

        // just under the threshold: nothing yet
        let almost = t0 + Duration::from_secs(599);
        assert!(tracker.stop_candidates(threshold, almost).is_empty());

        // at the threshold: running container only, never the exited one
        let due = t0 + Duration::from_secs(600);
        assert_eq!(tracker.stop_candidates(threshold, due), vec!["jellyfin"]);
    }

    #[test]
    fn access_defers_stop() {
        let t0 = Instant::now();
        let threshold = Duration::from_secs(600);
        let mut tracker = ContainerTracker::new();
        tracker.sync(&[summary("jellyfin", "running", None)], URLS_LABEL, t0);

        let t500 = t0 + Duration::from_secs(500);
        tracker.record_matches("https://jellyfin.example.com/", t500);

        // 600s after discovery but only 100s after the access
        let t600 = t0 + Duration::from_secs(600);
        assert!(tracker.stop_candidates(threshold, t600).is_empty());

        let t1100 = t500 + Duration::from_secs(600);
        assert_eq!(tracker.stop_candidates(threshold, t1100), vec!["jellyfin"]);
    }

    #[test]
    fn mark_running_prevents_restart() {
        let t0 = Instant::now();
        let mut tracker = ContainerTracker::new();
        tracker.sync(&[summary("komga", "exited", None)], URLS_LABEL, t0);

        let to_start = tracker.record_matches("https://komga.example.com/", t0);
        assert_eq!(to_start, vec!["komga"]);
        tracker.mark_running("komga");

        let again = tracker.record_matches("https://komga.example.com/", t0);
        assert!(again.is_empty());
    }
}
