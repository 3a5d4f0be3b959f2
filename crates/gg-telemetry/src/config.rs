//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Default service name used in logs and reports.
pub const DEFAULT_SERVICE_NAME: &str = "guild-gate";

/// Configuration for logging and error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every error report
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether internal failures are forwarded to the error sink
    pub error_reporting: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            error_reporting: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GG_SERVICE_NAME`: Service name (default: guild-gate)
    /// - `GG_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `GG_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `GG_ERROR_REPORTING`: Forward internal failures to the sink (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("GG_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),

            log_level: lookup("GG_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            json_logs: lookup("GG_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            error_reporting: lookup("GG_ERROR_REPORTING")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }
}

/// `true`/`1`/`yes` (any case) are truthy, everything else is not.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
