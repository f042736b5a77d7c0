//! OpenAPI 3.x detection and bundling.
//!
//! This crate turns a multi-file OpenAPI spec into a single document:
//! - Detect whether a file is an OpenAPI 3 document
//! - Load the root file and every local file it references
//! - Move external `$ref` targets into `components` and rewrite the refs
//! - Report problems against configurable rules

pub mod bundle;
pub mod config;
pub mod detect;
pub mod error;
pub mod pointer;
pub mod problem;
pub mod source;

pub use bundle::{
    bundle, bundle_sources, dereference, remove_unused_components, BundleMeta, BundleOptions,
    BundleResult,
};
pub use config::{rules, Config, RuleSeverity, CONFIG_FILE_NAMES};
pub use detect::{is_openapi_line, is_openapi_spec};
pub use error::{BundleError, ConfigError};
pub use problem::{format_problems, totals, Location, Problem, Severity, Totals};
pub use source::{SourceError, SourceSet};
