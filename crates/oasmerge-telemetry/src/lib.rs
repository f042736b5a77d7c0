//! Logging infrastructure for oasmerge.
//!
//! # Usage
//!
//! ```ignore
//! use oasmerge_telemetry::TelemetryConfig;
//!
//! oasmerge_telemetry::init(&TelemetryConfig::from_env())?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Initialize logging with the given configuration.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)
}
