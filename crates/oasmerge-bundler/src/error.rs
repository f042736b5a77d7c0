use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a bundle before any problem can be reported.
///
/// Everything found inside a readable file (bad YAML, unresolved refs,
/// structural issues) is a [`Problem`](crate::Problem) instead.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The root spec file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors produced while loading the bundler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML or has unknown fields.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A rule name in the configuration is not known to the bundler.
    #[error("unknown rule '{rule}' in {}", .path.display())]
    UnknownRule { path: PathBuf, rule: String },
}
