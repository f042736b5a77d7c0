//! Bundle, rewrite and merge OpenAPI 3.x specs.
//!
//! Each input file is detected, bundled on its own, has its `schema`
//! component renamed after `info.x-ref-schema-name`, and is then merged with
//! the others into a single document.

pub mod error;
pub mod merge;
pub mod pipeline;
pub mod rewrite;

pub use error::{MergeError, PipelineError};
pub use merge::merge_documents;
pub use pipeline::{expand_patterns, generate, process_file, render, FileOutcome, VERSION};
pub use rewrite::{rewrite_schema_refs, SCHEMA_REF};
