//! Configuration types for a broker process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BrokerError, Result, constants};

/// Top-level broker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// How long a proxy poll waits for a client before returning "no match".
    pub proxy_timeout: Duration,
    /// How long a matched client waits for the proxy's answer.
    pub client_timeout: Duration,
    /// Periodic metrics reporting.
    pub metrics: MetricsConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Newline-delimited JSON list of bridges clients may ask for. Without
    /// one, only the default bridge is served.
    pub bridge_list_path: Option<PathBuf>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            proxy_timeout: Duration::from_millis(constants::DEFAULT_PROXY_TIMEOUT_MS),
            client_timeout: Duration::from_millis(constants::DEFAULT_CLIENT_TIMEOUT_MS),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
            bridge_list_path: None,
        }
    }
}

impl BrokerConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|e| BrokerError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject values that would make the broker unusable.
    pub fn validate(&self) -> Result<()> {
        if self.proxy_timeout.is_zero() {
            return Err(BrokerError::Configuration(
                "proxy_timeout must be greater than zero".into(),
            ));
        }
        if self.client_timeout.is_zero() {
            return Err(BrokerError::Configuration(
                "client_timeout must be greater than zero".into(),
            ));
        }
        if self.metrics.report_interval.is_zero() {
            return Err(BrokerError::Configuration(
                "metrics.report_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Periodic metrics report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Length of one measurement interval.
    pub report_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(constants::DEFAULT_METRICS_INTERVAL_SECS),
        }
    }
}

/// Log output settings. `RUST_LOG` overrides `filter` when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `"info,snowbroker_matchcore=debug"`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}
