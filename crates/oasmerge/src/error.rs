use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while merging bundled documents.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Nothing to merge.
    #[error("no OpenAPI documents to merge")]
    Empty,

    /// A document root is not a mapping.
    #[error("document {index} is not a mapping")]
    InvalidDocument { index: usize },

    /// Two documents define the same operation, or disagree on a path item field.
    #[error("conflicting definitions for path '{path}': {detail}")]
    PathConflict { path: String, detail: String },

    /// Two documents define the same component differently.
    #[error("conflicting definitions for components.{section}.{name}")]
    ComponentConflict { section: String, name: String },

    /// A section holds a list in one document and something else in another.
    #[error("'{key}' does not have the same shape in every document")]
    SectionMismatch { key: String },
}

/// Errors produced by the generate pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No file arguments were given.
    #[error("no files provided")]
    NoInputFiles,

    /// None of the arguments matched a file.
    #[error("no files matched: {}", .patterns.join(", "))]
    NoMatchingFiles { patterns: Vec<String> },

    /// A glob pattern is malformed.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// A directory could not be read during glob expansion.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    /// A candidate file could not be read during detection.
    #[error("failed to read {}: {source}", .path.display())]
    Detect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A spec file could not be bundled.
    #[error(transparent)]
    Bundle(#[from] oasmerge_bundler::BundleError),

    /// Bundling reported problems; merge was not attempted.
    ///
    /// `report` holds the formatted problem listing for the caller to print.
    #[error("problems when bundling, not trying to merge ({count} problem(s))")]
    BundlingProblems { count: usize, report: String },

    /// The bundled documents could not be merged.
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// The merged document could not be serialized.
    #[error("failed to serialize merged document: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// The bundler configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] oasmerge_bundler::ConfigError),

    /// Other I/O failure (working directory, stdout).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Process exit code for this error.
    ///
    /// 1 = usage error, bundling problems or merge conflict
    /// 3 = I/O or configuration error
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::NoInputFiles
            | PipelineError::NoMatchingFiles { .. }
            | PipelineError::Pattern { .. }
            | PipelineError::BundlingProblems { .. }
            | PipelineError::Merge(_)
            | PipelineError::Serialize(_) => 1,
            PipelineError::Glob(_)
            | PipelineError::Detect { .. }
            | PipelineError::Bundle(_)
            | PipelineError::Config(_)
            | PipelineError::Io(_) => 3,
        }
    }
}
