//! The `generate` pipeline: expand, detect, bundle, rewrite, merge.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use serde_yaml::Value;

use oasmerge_bundler::{
    bundle, format_problems, is_openapi_spec, totals, BundleOptions, Config, Problem,
};
use oasmerge_telemetry::{
    log_bundle_problems, log_file_bundled, log_file_skipped, log_merge_completed,
    log_schema_refs_rewritten,
};

use crate::error::PipelineError;
use crate::merge::merge_documents;
use crate::rewrite::{declared_schema_name, rewrite_schema_refs};

/// Version reported in the problem summary line.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bundling options used by `generate`: keep internal refs and unused components.
pub const GENERATE_OPTIONS: BundleOptions = BundleOptions {
    dereference: false,
    remove_unused_components: false,
};

/// Outcome of processing one candidate file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Not an OpenAPI document.
    Skipped,
    /// Bundled and rewritten.
    Document(Value),
    /// Bundling reported problems.
    Problems(Vec<Problem>),
}

/// Expand file arguments into an ordered, deduplicated list of files.
///
/// Arguments without glob metacharacters that name an existing file are kept
/// as given.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let literal = Path::new(pattern);
        if !has_glob_meta(pattern) && literal.is_file() {
            push_unique(&mut files, literal.to_path_buf());
            continue;
        }

        let entries = glob::glob(pattern).map_err(|source| PipelineError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in entries {
            let path = entry?;
            if path.is_file() {
                push_unique(&mut files, path);
            }
        }
    }

    Ok(files)
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn push_unique(files: &mut Vec<PathBuf>, path: PathBuf) {
    if !files.contains(&path) {
        files.push(path);
    }
}

/// Detect, bundle and rewrite a single file.
pub async fn process_file(path: &Path, config: &Config) -> Result<FileOutcome, PipelineError> {
    let is_spec = is_openapi_spec(path)
        .await
        .map_err(|source| PipelineError::Detect {
            path: path.to_path_buf(),
            source,
        })?;
    if !is_spec {
        log_file_skipped!(file = %path.display(), "not an OpenAPI document");
        return Ok(FileOutcome::Skipped);
    }

    let result = bundle(config, path, GENERATE_OPTIONS).await?;
    if !result.problems.is_empty() {
        log_bundle_problems!(
            file = %path.display(),
            problems = result.problems.len(),
            "bundling reported problems"
        );
        return Ok(FileOutcome::Problems(result.problems));
    }

    let mut document = result.document;
    let name = declared_schema_name(&document).map(str::to_string);
    if rewrite_schema_refs(&mut document) {
        log_schema_refs_rewritten!(
            file = %path.display(),
            schema_name = name.as_deref().unwrap_or_default(),
            "rewrote schema refs"
        );
    }

    log_file_bundled!(
        file = %path.display(),
        dependencies = result.meta.file_dependencies.len(),
        "bundled"
    );
    Ok(FileOutcome::Document(document))
}

/// Run the pipeline and return the merged document.
///
/// Problems from any file abort the run before merging. The formatted listing
/// travels in [`PipelineError::BundlingProblems`].
pub async fn generate(patterns: &[String], config: &Config) -> Result<Value, PipelineError> {
    if patterns.is_empty() {
        return Err(PipelineError::NoInputFiles);
    }

    let files = expand_patterns(patterns)?;
    if files.is_empty() {
        return Err(PipelineError::NoMatchingFiles {
            patterns: patterns.to_vec(),
        });
    }

    let tasks = files.iter().enumerate().map(|(index, path)| async move {
        (index, process_file(path, config).await)
    });
    let mut outcomes = join_all(tasks).await;
    outcomes.sort_by_key(|(index, _)| *index);

    let mut documents = Vec::new();
    let mut problems = Vec::new();
    for (_, outcome) in outcomes {
        match outcome? {
            FileOutcome::Skipped => {}
            FileOutcome::Document(document) => documents.push(document),
            FileOutcome::Problems(found) => problems.extend(found),
        }
    }

    if !problems.is_empty() {
        let totals = totals(&problems);
        return Err(PipelineError::BundlingProblems {
            count: totals.total(),
            report: format_problems(&problems, totals, VERSION),
        });
    }

    let count = documents.len();
    let merged = merge_documents(documents)?;
    log_merge_completed!(documents = count, "merged");
    Ok(merged)
}

/// Serialize the merged document as YAML.
pub fn render(document: &Value) -> Result<String, PipelineError> {
    Ok(serde_yaml::to_string(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;
    use oasmerge_bundler::{rules, RuleSeverity};
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn spec(title: &str, name: &str, path: &str) -> String {
        format!(
            r#"openapi: 3.0.3
info:
  title: {title}
  version: "1.0.0"
  x-ref-schema-name: {name}
paths:
  {path}:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/{name}Item'
components:
  schemas:
    {name}Item:
      $ref: ./schema.json
"#
        )
    }

    fn arg(path: &Path) -> String {
        path.display().to_string()
    }

    #[test]
    fn expand_keeps_order_and_dedupes() {
        let temp = TempDir::new().unwrap();
        let b = write(temp.path(), "b.yaml", "x: 1\n");
        let a = write(temp.path(), "a.yaml", "x: 1\n");
        std::fs::create_dir(temp.path().join("dir.yaml")).unwrap();

        let patterns = vec![
            arg(&b),
            temp.path().join("*.yaml").display().to_string(),
            arg(&b),
        ];
        let files = expand_patterns(&patterns).unwrap();
        assert_eq!(files, vec![b, a]);
    }

    #[test]
    fn expand_rejects_bad_pattern() {
        let err = expand_patterns(&["specs/[".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::Pattern { .. }));
    }

    #[tokio::test]
    async fn no_patterns_is_usage_error() {
        let err = generate(&[], &Config::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoInputFiles));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn no_matches_is_error() {
        let temp = TempDir::new().unwrap();
        let pattern = temp.path().join("*.yaml").display().to_string();
        let err = generate(&[pattern], &Config::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoMatchingFiles { .. }));
    }

    #[tokio::test]
    async fn merges_rewritten_documents() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "widgets/schema.json", r#"{"type": "object", "title": "widget"}"#);
        write(temp.path(), "gadgets/schema.json", r#"{"type": "object", "title": "gadget"}"#);
        let widgets = write(
            temp.path(),
            "widgets/api.yaml",
            &spec("Widgets", "Widget", "/widgets"),
        );
        let gadgets = write(
            temp.path(),
            "gadgets/api.yaml",
            &spec("Gadgets", "Gadget", "/gadgets"),
        );
        write(temp.path(), "widgets/notes.yaml", "title: not a spec\n");

        let patterns = vec![
            arg(&widgets),
            arg(&gadgets),
            temp.path().join("widgets/notes.yaml").display().to_string(),
        ];
        let merged = generate(&patterns, &Config::default()).await.unwrap();

        let schemas = &merged["components"]["schemas"];
        assert_eq!(schemas["WidgetItem"]["title"].as_str(), Some("widget"));
        assert_eq!(schemas["GadgetItem"]["title"].as_str(), Some("gadget"));
        assert!(schemas.get("schema").is_none());
        assert_eq!(merged["info"]["title"].as_str(), Some("Widgets"));

        let yaml = render(&merged).unwrap();
        assert!(!yaml.contains("#/components/schemas/schema'"));
        assert!(!yaml.contains("#/components/schemas/schema\n"));
        assert!(yaml.contains("#/components/schemas/GadgetItem"));
    }

    #[tokio::test]
    async fn problems_block_merge() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "ok/schema.json", r#"{"type": "object"}"#);
        let ok = write(temp.path(), "ok/api.yaml", &spec("Ok", "Ok", "/ok"));
        let broken = write(temp.path(), "broken/api.yaml", &spec("Broken", "Broken", "/broken"));

        let err = generate(&[arg(&ok), arg(&broken)], &Config::default())
            .await
            .unwrap_err();
        let PipelineError::BundlingProblems { count, report } = err else {
            panic!("expected bundling problems, got {err:?}");
        };
        assert_eq!(count, 1);
        assert!(report.contains(rules::NO_UNRESOLVED_REFS));
        assert!(report.contains("broken"));
        assert!(report.contains("1 error and 0 warnings in 1 file"));
    }

    #[tokio::test]
    async fn warnings_also_block_merge() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            "api.yaml",
            r#"openapi: 3.0.3
info:
  title: Pets
  version: "1.0.0"
paths: {}
components:
  schemas:
    "Pet Item":
      type: object
"#,
        );

        let err = generate(&[arg(&path)], &Config::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::BundlingProblems { count: 1, .. }));

        let config = Config::default().with_rule(rules::COMPONENT_NAMES, RuleSeverity::Off);
        assert!(generate(&[arg(&path)], &config).await.is_ok());
    }

    #[tokio::test]
    async fn null_components_in_first_spec_keep_later_schemas() {
        let temp = TempDir::new().unwrap();
        let bare = write(
            temp.path(),
            "bare/api.yaml",
            r#"openapi: 3.0.3
info:
  title: Bare
  version: "1.0.0"
paths:
  /health:
    get:
      responses:
        "204":
          description: healthy
components:
  schemas:
"#,
        );
        write(temp.path(), "gadgets/schema.json", r#"{"type": "object", "title": "gadget"}"#);
        let gadgets = write(
            temp.path(),
            "gadgets/api.yaml",
            &spec("Gadgets", "Gadget", "/gadgets"),
        );

        let merged = generate(&[arg(&bare), arg(&gadgets)], &Config::default())
            .await
            .unwrap();

        assert_eq!(merged["info"]["title"].as_str(), Some("Bare"));
        assert_eq!(
            merged["components"]["schemas"]["GadgetItem"]["title"].as_str(),
            Some("gadget")
        );
        assert!(merged["paths"].get("/health").is_some());
        assert!(render(&merged)
            .unwrap()
            .contains("#/components/schemas/GadgetItem"));
    }

    #[tokio::test]
    async fn only_non_specs_is_empty_merge() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "notes.yaml", "title: nothing\n");
        let err = generate(&[arg(&path)], &Config::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Merge(MergeError::Empty)));
    }

    #[tokio::test]
    async fn merge_conflict_is_reported() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/schema.json", r#"{"type": "object"}"#);
        write(temp.path(), "b/schema.json", r#"{"type": "object"}"#);
        let a = write(temp.path(), "a/api.yaml", &spec("A", "A", "/same"));
        let b = write(temp.path(), "b/api.yaml", &spec("B", "B", "/same"));

        let err = generate(&[arg(&a), arg(&b)], &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Merge(MergeError::PathConflict { .. })
        ));
    }
}
