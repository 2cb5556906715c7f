//! Metric name constants and descriptions.
//!
//! All Prometheus metric names are defined centrally here. Modules
//! call `metrics::counter!()` / `metrics::gauge!()` with these
//! constants; the daemon installs the recorder and registers the
//! descriptions once at startup.
//!
//! # Naming convention
//!
//! - Prefix: `ondemand_`
//! - Module: `log_watch_`, `reconciler_`, `daemon_`
//! - Suffix: `_total` (counter), `_seconds` (gauge of time), none (gauge)

/// Container name label key.
pub const LABEL_CONTAINER: &str = "container";

// --- Log watcher metrics ---

/// Log lines read from the access log (counter).
pub const LOG_WATCH_LINES_TOTAL: &str = "ondemand_log_watch_lines_total";

/// URLs extracted and recorded into the access set (counter).
pub const LOG_WATCH_URLS_RECORDED_TOTAL: &str = "ondemand_log_watch_urls_recorded_total";

/// Log rotations detected and survived (counter).
pub const LOG_WATCH_ROTATIONS_TOTAL: &str = "ondemand_log_watch_rotations_total";

// --- Reconciler metrics ---

/// Completed reconciliation cycles (counter).
pub const RECONCILER_CYCLES_TOTAL: &str = "ondemand_reconciler_cycles_total";

/// Container starts issued (counter, label: container).
pub const RECONCILER_STARTS_TOTAL: &str = "ondemand_reconciler_starts_total";

/// Container stops issued (counter, label: container).
pub const RECONCILER_STOPS_TOTAL: &str = "ondemand_reconciler_stops_total";

/// Containers currently tracked (gauge).
pub const RECONCILER_TRACKED_CONTAINERS: &str = "ondemand_reconciler_tracked_containers";

// --- Daemon metrics ---

/// Daemon uptime in seconds (gauge).
pub const DAEMON_UPTIME_SECONDS: &str = "ondemand_daemon_uptime_seconds";

/// Register descriptions for all metrics with the installed recorder.
///
/// Call once after the recorder is installed. Safe to skip when
/// metrics are disabled; all macro calls are no-ops without a recorder.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        LOG_WATCH_LINES_TOTAL,
        "Log lines read from the access log"
    );
    describe_counter!(
        LOG_WATCH_URLS_RECORDED_TOTAL,
        "URLs extracted and recorded into the access set"
    );
    describe_counter!(
        LOG_WATCH_ROTATIONS_TOTAL,
        "Log rotations detected and survived"
    );
    describe_counter!(RECONCILER_CYCLES_TOTAL, "Completed reconciliation cycles");
    describe_counter!(RECONCILER_STARTS_TOTAL, "Container starts issued");
    describe_counter!(RECONCILER_STOPS_TOTAL, "Container stops issued");
    describe_gauge!(
        RECONCILER_TRACKED_CONTAINERS,
        "Containers currently tracked"
    );
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
}
