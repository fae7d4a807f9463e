//! Configuration types for the BiasGuard monitor

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default coordinator base URL
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";

/// Default triggering node checked by the alert evaluator
pub const DEFAULT_TRIGGERING_NODE: &str = "Hospital B";

/// Default demographic parity threshold
pub const DEFAULT_BIAS_THRESHOLD: f64 = 0.15;

/// Monitor-level configuration
///
/// Missing fields in a config file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Coordinator base URL; snapshots are read from `<endpoint>/metrics`
    pub endpoint: String,

    /// Poll interval in milliseconds (default: 2000)
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds (default: 5000)
    pub request_timeout_ms: u64,

    /// Maximum history points kept (default: 20)
    pub history_capacity: usize,

    /// Client whose bias score gates the fairness alert
    pub triggering_node: String,

    /// Alert fires when the node's score is strictly above this value
    pub bias_threshold: f64,

    /// Maximum log lines kept in the feed (default: 200)
    pub log_capacity: usize,

    /// Consecutive failures tolerated before the feed is reported unhealthy
    pub failure_budget: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval_ms: 2000,
            request_timeout_ms: 5000,
            history_capacity: 20,
            triggering_node: DEFAULT_TRIGGERING_NODE.to_string(),
            bias_threshold: DEFAULT_BIAS_THRESHOLD,
            log_capacity: 200,
            failure_budget: 5,
        }
    }
}

impl MonitorConfig {
    /// Create a configuration pointing at a specific coordinator
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Create a configuration with a custom poll interval
    pub fn with_poll_interval_ms(poll_interval_ms: u64) -> Self {
        Self {
            poll_interval_ms,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Full URL of the snapshot endpoint
    pub fn metrics_url(&self) -> String {
        format!("{}/metrics", self.endpoint.trim_end_matches('/'))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check every value the pipeline depends on
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "history_capacity must be greater than 0".to_string(),
            ));
        }
        if self.log_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "log_capacity must be greater than 0".to_string(),
            ));
        }
        if self.triggering_node.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "triggering_node must not be empty".to_string(),
            ));
        }
        if !self.bias_threshold.is_finite() || self.bias_threshold < 0.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "bias_threshold must be a non-negative number, got {}",
                self.bias_threshold
            )));
        }
        reqwest::Url::parse(&self.metrics_url()).map_err(|e| {
            MonitorError::InvalidConfig(format!("endpoint {:?}: {}", self.endpoint, e))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.endpoint, "http://127.0.0.1:8000");
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.triggering_node, "Hospital B");
        assert!((config.bias_threshold - 0.15).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_url_trims_trailing_slash() {
        let config = MonitorConfig::with_endpoint("http://coordinator:8000/");
        assert_eq!(config.metrics_url(), "http://coordinator:8000/metrics");

        let config = MonitorConfig::default();
        assert_eq!(config.metrics_url(), "http://127.0.0.1:8000/metrics");
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = MonitorConfig::with_poll_interval_ms(0);
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            MonitorConfig {
                history_capacity: 0,
                ..Default::default()
            },
            MonitorConfig {
                triggering_node: "  ".to_string(),
                ..Default::default()
            },
            MonitorConfig {
                bias_threshold: f64::NAN,
                ..Default::default()
            },
            MonitorConfig {
                bias_threshold: -0.1,
                ..Default::default()
            },
            MonitorConfig::with_endpoint("not a url"),
        ];
        for config in bad {
            assert!(config.validate().is_err(), "accepted {:?}", config);
        }
    }

    #[test]
    fn test_from_json_file_partial_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"endpoint": "http://10.0.0.5:9000", "triggering_node": "Hospital C"}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = MonitorConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.5:9000");
        assert_eq!(config.triggering_node, "Hospital C");
        assert_eq!(config.poll_interval_ms, 2000);
    }

    #[test]
    fn test_from_json_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"history_capacity": 0}}"#).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            MonitorConfig::from_json_file(file.path()),
            Err(MonitorError::InvalidConfig(_))
        ));
    }
}
