//! Loading a root spec and every local file it references.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;

use crate::error::BundleError;

/// Why a referenced file is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The file could not be read.
    Read(String),
    /// The file is not valid YAML/JSON.
    Parse(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Read(msg) => write!(f, "read error: {}", msg),
            SourceError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

/// Target of a `$ref` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget<'a> {
    /// `#/pointer` within the same file.
    Local { pointer: &'a str },
    /// `path/to/file.yaml#/pointer` (pointer may be empty).
    File { path: &'a str, pointer: &'a str },
    /// `http(s)://...`, never fetched.
    Remote(&'a str),
}

/// Classify a `$ref` value.
pub fn split_ref(reference: &str) -> RefTarget<'_> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return RefTarget::Remote(reference);
    }
    match reference.split_once('#') {
        Some(("", pointer)) => RefTarget::Local { pointer },
        Some((path, pointer)) => RefTarget::File { path, pointer },
        None => RefTarget::File {
            path: reference,
            pointer: "",
        },
    }
}

/// Resolve `relative` against the directory of `base_file`, lexically.
pub fn resolve_path(base_file: &Path, relative: &str) -> PathBuf {
    let base_dir = base_file.parent().unwrap_or_else(|| Path::new(""));
    normalize(&base_dir.join(relative))
}

/// Remove `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Collect every `$ref` string in a tree, in document order.
pub fn collect_refs<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                if key.as_str() == Some("$ref") {
                    if let Some(reference) = child.as_str() {
                        out.push(reference);
                        continue;
                    }
                }
                collect_refs(child, out);
            }
        }
        Value::Sequence(seq) => {
            for child in seq {
                collect_refs(child, out);
            }
        }
        Value::Tagged(tagged) => collect_refs(&tagged.value, out),
        _ => {}
    }
}

/// A root spec plus every file reachable through external `$ref`s.
#[derive(Debug)]
pub struct SourceSet {
    root: PathBuf,
    documents: HashMap<PathBuf, Result<Value, SourceError>>,
}

impl SourceSet {
    /// Read the root file and, transitively, the local files it references.
    ///
    /// Only a failure to read the root is an error. Unreadable or invalid
    /// referenced files are recorded and surface later as problems.
    pub async fn load(root: &Path) -> Result<Self, BundleError> {
        let root = normalize(root);
        let content = tokio::fs::read_to_string(&root)
            .await
            .map_err(|source| BundleError::Io {
                path: root.clone(),
                source,
            })?;

        let mut documents = HashMap::new();
        let parsed = parse(&content);
        let mut pending = match &parsed {
            Ok(doc) => external_files(&root, doc),
            Err(_) => Vec::new(),
        };
        documents.insert(root.clone(), parsed);

        while let Some(path) = pending.pop() {
            if documents.contains_key(&path) {
                continue;
            }
            let loaded = match tokio::fs::read_to_string(&path).await {
                Ok(content) => parse(&content),
                Err(e) => Err(SourceError::Read(e.to_string())),
            };
            if let Ok(doc) = &loaded {
                pending.extend(external_files(&path, doc));
            }
            tracing::trace!(file = %path.display(), ok = loaded.is_ok(), "loaded referenced file");
            documents.insert(path, loaded);
        }

        Ok(Self { root, documents })
    }

    /// Build a set from already-parsed documents, keyed by normalized path.
    ///
    /// A set without an entry for `root` bundles to a single `struct` problem.
    pub fn from_documents(
        root: PathBuf,
        documents: HashMap<PathBuf, Result<Value, SourceError>>,
    ) -> Self {
        Self { root, documents }
    }

    /// Normalized path of the root file.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// A loaded document, or why it could not be loaded.
    pub fn get(&self, path: &Path) -> Option<&Result<Value, SourceError>> {
        self.documents.get(path)
    }

    /// The parsed root document, if it parsed.
    pub fn root_document(&self) -> Option<&Value> {
        self.get(&self.root).and_then(|r| r.as_ref().ok())
    }
}

fn parse(content: &str) -> Result<Value, SourceError> {
    serde_yaml::from_str(content).map_err(|e| SourceError::Parse(e.to_string()))
}

fn external_files(base: &Path, doc: &Value) -> Vec<PathBuf> {
    let mut refs = Vec::new();
    collect_refs(doc, &mut refs);
    refs.into_iter()
        .filter_map(|reference| match split_ref(reference) {
            RefTarget::File { path, .. } => Some(resolve_path(base, path)),
            _ => None,
        })
        .collect()
}
