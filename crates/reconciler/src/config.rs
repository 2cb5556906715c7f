//! Reconciler configuration.
//!
//! [`ReconcileConfig`] derives from the `[reconciler]` section of the
//! core config. The label filter string handed to Docker is derived
//! once from the enable label/value pair.

use std::time::Duration;

use crate::error::ReconcilerError;

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Time between reconciliation cycles.
    pub poll_interval: Duration,
    /// Idle time after which a running container is stopped.
    pub stop_threshold: Duration,
    /// Label key that opts a container in.
    pub enable_label: String,
    /// Required value of the enable label.
    pub enable_value: String,
    /// Label key holding comma-separated URL prefix patterns.
    pub urls_label: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            stop_threshold: Duration::from_secs(600),
            enable_label: "swag_ondemand".to_owned(),
            enable_value: "enable".to_owned(),
            urls_label: "swag_ondemand_urls".to_owned(),
        }
    }
}

impl ReconcileConfig {
    /// Build from the core `[reconciler]` section.
    pub fn from_core(core: &ondemand_core::config::ReconcilerConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs_f64(core.poll_interval_secs),
            stop_threshold: Duration::from_secs(core.stop_threshold_secs),
            enable_label: core.enable_label.clone(),
            enable_value: core.enable_value.clone(),
            urls_label: core.urls_label.clone(),
        }
    }

    /// The `key=value` filter string handed to the Docker list call.
    pub fn label_filter(&self) -> String {
        format!("{}={}", self.enable_label, self.enable_value)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ReconcilerError> {
        if self.poll_interval.is_zero() {
            return Err(ReconcilerError::Config {
                field: "poll_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.stop_threshold.is_zero() {
            return Err(ReconcilerError::Config {
                field: "stop_threshold".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.enable_label.is_empty() || self.enable_value.is_empty() {
            return Err(ReconcilerError::Config {
                field: "enable_label".to_owned(),
                reason: "label and value must not be empty".to_owned(),
            });
        }
        if self.urls_label.is_empty() {
            return Err(ReconcilerError::Config {
                field: "urls_label".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

/// Builder for [`ReconcileConfig`].
#[derive(Default)]
pub struct ReconcileConfigBuilder {
    config: ReconcileConfig,
}

impl ReconcileConfigBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cycle interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the idle stop threshold.
    pub fn stop_threshold(mut self, threshold: Duration) -> Self {
        self.config.stop_threshold = threshold;
        self
    }

    /// Set the enable label key.
    pub fn enable_label(mut self, label: impl Into<String>) -> Self {
        self.config.enable_label = label.into();
        self
    }

    /// Set the required enable label value.
    pub fn enable_value(mut self, value: impl Into<String>) -> Self {
        self.config.enable_value = value.into();
        self
    }

    /// Set the URL patterns label key.
    pub fn urls_label(mut self, label: impl Into<String>) -> Self {
        self.config.urls_label = label.into();
        self
    }

    /// Validate and produce the config.
    pub fn build(self) -> Result<ReconcileConfig, ReconcilerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
