//! # Guild-Gate Telemetry
//!
//! Logging setup and error reporting for the gate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gg_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! let sink = gg_telemetry::sink_for(&config);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GG_SERVICE_NAME` | `guild-gate` | Service name in reports |
//! | `GG_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `GG_JSON_LOGS` | `false` | JSON log lines (default on in containers) |
//! | `GG_ERROR_REPORTING` | `true` | Forward internal failures to the sink |

mod config;
mod logging;
mod reporting;

pub use config::{parse_flag, TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::init_logging;
pub use reporting::{
    DisabledErrorSink, ErrorReport, ErrorSink, EventId, MemoryErrorSink, TracingErrorSink,
    TAG_REGISTRATION_ID, TAG_REQUEST_ID, TAG_SESSION_ID, TAG_STAGE,
};

use std::sync::Arc;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Error sink matching the configuration.
pub fn sink_for(config: &TelemetryConfig) -> Arc<dyn ErrorSink> {
    if config.error_reporting {
        Arc::new(TracingErrorSink::new(config.service_name.clone()))
    } else {
        Arc::new(DisabledErrorSink)
    }
}
