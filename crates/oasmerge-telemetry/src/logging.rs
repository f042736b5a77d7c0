//! Structured logging to stderr.
//!
//! Stdout is reserved for the merged document, so every layer writes to stderr.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber: one stderr layer, filtered by `log_level`.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::InvalidFilter(e.to_string()))?;

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let compact_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(compact_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A candidate file did not look like an OpenAPI document.
    pub const FILE_SKIPPED: &str = "file_skipped";

    /// A file was bundled without problems.
    pub const FILE_BUNDLED: &str = "file_bundled";

    /// Bundling reported problems for a file.
    pub const BUNDLE_PROBLEMS: &str = "bundle_problems";

    /// The `schema` convention was rewritten to a named item schema.
    pub const SCHEMA_REFS_REWRITTEN: &str = "schema_refs_rewritten";

    /// All documents were merged.
    pub const MERGE_COMPLETED: &str = "merge_completed";
}

#[macro_export]
macro_rules! log_file_skipped {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::FILE_SKIPPED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_file_bundled {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::FILE_BUNDLED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_bundle_problems {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::BUNDLE_PROBLEMS,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_schema_refs_rewritten {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::SCHEMA_REFS_REWRITTEN,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_merge_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::MERGE_COMPLETED,
            $($field)*
        )
    };
}
