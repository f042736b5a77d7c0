//! Logging configuration, read from `OASMERGE_LOG` and `OASMERGE_LOG_FORMAT`.

/// Environment variable holding the log filter (EnvFilter syntax).
pub const LOG_ENV: &str = "OASMERGE_LOG";

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "OASMERGE_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON output (CI pipelines, log shippers).
    Json,
    /// Compact human-readable output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Log level filter and output format.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level filter (default: "warn").
    ///
    /// Stdout carries the merged document, so logs stay quiet unless asked for.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Defaults: `warn`, compact human-readable output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `OASMERGE_LOG` and `OASMERGE_LOG_FORMAT`.
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_ENV).filter(|l| !l.trim().is_empty()) {
            config.log_level = level;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).as_deref().and_then(LogFormat::parse) {
            config.log_format = format;
        }
        config
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}
