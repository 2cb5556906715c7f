//! Configuration -- `ondemand.toml` parsing and runtime settings.
//!
//! [`OndemandConfig`] is the top-level structure holding every
//! module's settings.
//!
//! # Loading precedence
//! 1. CLI arguments (highest)
//! 2. Environment variables (`ONDEMAND_RECONCILER_STOP_THRESHOLD_SECS=300` form)
//! 3. Config file (`ondemand.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), ondemand_core::error::OndemandError> {
//! use ondemand_core::config::OndemandConfig;
//!
//! // Load from file + apply env overrides
//! let config = OndemandConfig::load("ondemand.toml").await?;
//!
//! // Parse directly from a TOML string
//! let config = OndemandConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, OndemandError};

/// Top-level swag-ondemand configuration.
///
/// Mirrors the structure of `ondemand.toml`. Each module reads only
/// its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OndemandConfig {
    /// General settings (logging, PID file).
    #[serde(default)]
    pub general: GeneralConfig,
    /// Log watcher settings.
    #[serde(default)]
    pub log_watch: LogWatchConfig,
    /// Reconciler settings.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    /// Metrics endpoint settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl OndemandConfig {
    /// Load configuration from a TOML file and apply env overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, OndemandError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file (no env overrides).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, OndemandError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OndemandError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                OndemandError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, OndemandError> {
        toml::from_str(toml_str).map_err(|e| {
            OndemandError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Override settings from environment variables.
    ///
    /// Naming rule: `ONDEMAND_{SECTION}_{FIELD}`,
    /// e.g. `ONDEMAND_LOG_WATCH_ACCESS_LOG_PATH=/config/log/nginx/access.log`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "ONDEMAND_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "ONDEMAND_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "ONDEMAND_GENERAL_PID_FILE");

        // Log watcher
        override_string(
            &mut self.log_watch.access_log_path,
            "ONDEMAND_LOG_WATCH_ACCESS_LOG_PATH",
        );
        override_f64(
            &mut self.log_watch.poll_interval_secs,
            "ONDEMAND_LOG_WATCH_POLL_INTERVAL_SECS",
        );

        // Reconciler
        override_string(
            &mut self.reconciler.docker_socket,
            "ONDEMAND_RECONCILER_DOCKER_SOCKET",
        );
        override_f64(
            &mut self.reconciler.poll_interval_secs,
            "ONDEMAND_RECONCILER_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.reconciler.stop_threshold_secs,
            "ONDEMAND_RECONCILER_STOP_THRESHOLD_SECS",
        );
        override_string(
            &mut self.reconciler.enable_label,
            "ONDEMAND_RECONCILER_ENABLE_LABEL",
        );
        override_string(
            &mut self.reconciler.enable_value,
            "ONDEMAND_RECONCILER_ENABLE_VALUE",
        );
        override_string(
            &mut self.reconciler.urls_label,
            "ONDEMAND_RECONCILER_URLS_LABEL",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "ONDEMAND_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "ONDEMAND_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "ONDEMAND_METRICS_PORT");
    }

    /// Validate all settings.
    pub fn validate(&self) -> Result<(), OndemandError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.log_watch.access_log_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_watch.access_log_path".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        validate_interval(
            self.log_watch.poll_interval_secs,
            "log_watch.poll_interval_secs",
        )?;
        validate_interval(
            self.reconciler.poll_interval_secs,
            "reconciler.poll_interval_secs",
        )?;

        if self.reconciler.stop_threshold_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconciler.stop_threshold_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.reconciler.enable_label.is_empty() || self.reconciler.enable_value.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "reconciler.enable_label".to_owned(),
                reason: "enable label and value must not be empty".to_owned(),
            }
            .into());
        }

        if self.reconciler.urls_label.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "reconciler.urls_label".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

fn validate_interval(value: f64, field: &str) -> Result<(), OndemandError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: "must be a positive number of seconds".to_owned(),
        }
        .into());
    }
    Ok(())
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log format (json, pretty).
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// PID file path. Empty disables PID file handling.
    #[serde(default)]
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            pid_file: String::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> String {
    "json".to_owned()
}

/// Log watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogWatchConfig {
    /// Path to the reverse proxy's access log.
    #[serde(default = "default_access_log_path")]
    pub access_log_path: String,
    /// Sleep between read attempts when the log has no new lines (seconds).
    #[serde(default = "default_log_poll_interval")]
    pub poll_interval_secs: f64,
}

impl Default for LogWatchConfig {
    fn default() -> Self {
        Self {
            access_log_path: default_access_log_path(),
            poll_interval_secs: default_log_poll_interval(),
        }
    }
}

fn default_access_log_path() -> String {
    "/config/log/nginx/access.log".to_owned()
}

fn default_log_poll_interval() -> f64 {
    1.0
}

/// Reconciler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Docker socket path. Empty uses the platform default connection.
    #[serde(default)]
    pub docker_socket: String,
    /// Seconds between reconciliation cycles.
    #[serde(default = "default_reconcile_poll_interval")]
    pub poll_interval_secs: f64,
    /// Idle seconds after which a running container is stopped.
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold_secs: u64,
    /// Label key that opts a container in to on-demand management.
    #[serde(default = "default_enable_label")]
    pub enable_label: String,
    /// Required value of the enable label.
    #[serde(default = "default_enable_value")]
    pub enable_value: String,
    /// Label key holding comma-separated URL prefix patterns.
    #[serde(default = "default_urls_label")]
    pub urls_label: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            docker_socket: String::new(),
            poll_interval_secs: default_reconcile_poll_interval(),
            stop_threshold_secs: default_stop_threshold(),
            enable_label: default_enable_label(),
            enable_value: default_enable_value(),
            urls_label: default_urls_label(),
        }
    }
}

fn default_reconcile_poll_interval() -> f64 {
    5.0
}

fn default_stop_threshold() -> u64 {
    600
}

fn default_enable_label() -> String {
    "swag_ondemand".to_owned()
}

fn default_enable_value() -> String {
    "enable".to_owned()
}

fn default_urls_label() -> String {
    "swag_ondemand_urls".to_owned()
}

/// Metrics endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to expose the Prometheus endpoint.
    #[serde(default)]
    pub enabled: bool,
    /// Listen address for the metrics HTTP server.
    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: String,
    /// Listen port for the metrics HTTP server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    /// Scrape endpoint path.
    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
            port: default_metrics_port(),
            endpoint: default_metrics_endpoint(),
        }
    }
}

fn default_metrics_listen_addr() -> String {
    "127.0.0.1".to_owned()
}

fn default_metrics_port() -> u16 {
    9184
}

fn default_metrics_endpoint() -> String {
    "/metrics".to_owned()
}

// --- Env override helpers ---

fn override_string(target: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *target = value;
    }
}

fn override_bool(target: &mut bool, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var = var, value = %value, "ignoring non-boolean env override"),
        }
    }
}

fn override_u64(target: &mut u64, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var = var, value = %value, "ignoring non-integer env override"),
        }
    }
}

fn override_u16(target: &mut u16, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var = var, value = %value, "ignoring non-integer env override"),
        }
    }
}

fn override_f64(target: &mut f64, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var = var, value = %value, "ignoring non-numeric env override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_is_valid() {
        let config = OndemandConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reconciler.poll_interval_secs, 5.0);
        assert_eq!(config.log_watch.poll_interval_secs, 1.0);
        assert_eq!(config.reconciler.stop_threshold_secs, 600);
        assert_eq!(config.reconciler.enable_label, "swag_ondemand");
        assert_eq!(config.reconciler.enable_value, "enable");
        assert_eq!(config.reconciler.urls_label, "swag_ondemand_urls");
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let config = OndemandConfig::parse(
            "[reconciler]\nstop_threshold_secs = 120\n\n[general]\nlog_level = \"debug\"",
        )
        .unwrap();
        assert_eq!(config.reconciler.stop_threshold_secs, 120);
        assert_eq!(config.general.log_level, "debug");
        // Unspecified sections keep defaults
        assert_eq!(config.log_watch.access_log_path, "/config/log/nginx/access.log");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        let result = OndemandConfig::parse("[general\nlog_level = ");
        assert!(matches!(
            result,
            Err(OndemandError::Config(ConfigError::ParseFailed { .. }))
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = OndemandConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = OndemandConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nonpositive_intervals() {
        let mut config = OndemandConfig::default();
        config.reconciler.poll_interval_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = OndemandConfig::default();
        config.log_watch.poll_interval_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = OndemandConfig::default();
        config.reconciler.poll_interval_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_stop_threshold() {
        let mut config = OndemandConfig::default();
        config.reconciler.stop_threshold_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_labels() {
        let mut config = OndemandConfig::default();
        config.reconciler.enable_label = String::new();
        assert!(config.validate().is_err());

        let mut config = OndemandConfig::default();
        config.reconciler.urls_label = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_access_log_path() {
        let mut config = OndemandConfig::default();
        config.log_watch.access_log_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn fractional_poll_interval_is_accepted() {
        let config =
            OndemandConfig::parse("[reconciler]\npoll_interval_secs = 0.5").unwrap();
        config.validate().unwrap();
        assert_eq!(config.reconciler.poll_interval_secs, 0.5);
    }

    #[test]
    #[serial]
    fn env_override_applies() {
        // Modifying process env; `serial` keeps these tests from racing.
        unsafe {
            std::env::set_var("ONDEMAND_RECONCILER_STOP_THRESHOLD_SECS", "42");
            std::env::set_var("ONDEMAND_GENERAL_LOG_LEVEL", "warn");
        }
        let mut config = OndemandConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("ONDEMAND_RECONCILER_STOP_THRESHOLD_SECS");
            std::env::remove_var("ONDEMAND_GENERAL_LOG_LEVEL");
        }
        assert_eq!(config.reconciler.stop_threshold_secs, 42);
        assert_eq!(config.general.log_level, "warn");
    }

    #[test]
    #[serial]
    fn env_override_ignores_garbage_numbers() {
        unsafe {
            std::env::set_var("ONDEMAND_RECONCILER_POLL_INTERVAL_SECS", "soon");
        }
        let mut config = OndemandConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("ONDEMAND_RECONCILER_POLL_INTERVAL_SECS");
        }
        assert_eq!(config.reconciler.poll_interval_secs, 5.0);
    }

    #[test]
    fn serialize_roundtrip() {
        let config = OndemandConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let back = OndemandConfig::parse(&toml_str).unwrap();
        assert_eq!(
            back.reconciler.stop_threshold_secs,
            config.reconciler.stop_threshold_secs
        );
        assert_eq!(back.general.log_format, config.general.log_format);
    }
}
