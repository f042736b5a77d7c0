//! Bundling: pull external `$ref` targets into the root document's components.
//!
//! Internal refs are left as they are unless dereferencing is requested.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use serde_yaml::{Mapping, Value};

use crate::config::{rules, Config};
use crate::error::BundleError;
use crate::pointer;
use crate::problem::{Problem, Severity};
use crate::source::{collect_refs, resolve_path, split_ref, RefTarget, SourceSet};

/// Component sections that can hold `$ref` targets.
const COMPONENT_SECTIONS: &[&str] = &[
    "schemas",
    "responses",
    "parameters",
    "examples",
    "requestBodies",
    "headers",
    "securitySchemes",
    "links",
    "callbacks",
];

/// Sections pruned by `remove_unused_components`. Security schemes are
/// referenced by name, not by `$ref`, so they are never pruned.
const PRUNABLE_SECTIONS: &[&str] = &[
    "schemas",
    "responses",
    "parameters",
    "examples",
    "requestBodies",
    "headers",
    "links",
    "callbacks",
];

/// Bundling options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleOptions {
    /// Replace internal refs with the content they point at.
    pub dereference: bool,
    /// Drop components nothing refers to.
    pub remove_unused_components: bool,
}

/// Information about a bundle beyond the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleMeta {
    /// External files pulled into the bundle, in first-use order.
    pub file_dependencies: Vec<PathBuf>,
}

/// Output of [`bundle`].
#[derive(Debug, Clone)]
pub struct BundleResult {
    /// The bundled document. Must not be used when `problems` is non-empty.
    pub document: Value,
    pub problems: Vec<Problem>,
    pub meta: BundleMeta,
}

/// Bundle the spec at `path`.
pub async fn bundle(
    config: &Config,
    path: &Path,
    options: BundleOptions,
) -> Result<BundleResult, BundleError> {
    let sources = SourceSet::load(path).await?;
    Ok(bundle_sources(config, &sources, options))
}

/// Bundle an already-loaded source set.
pub fn bundle_sources(config: &Config, sources: &SourceSet, options: BundleOptions) -> BundleResult {
    let root_path = sources.root_path();
    let mut reporter = Reporter::new(config);

    let mut document = match sources.get(root_path) {
        Some(Ok(doc)) => doc.clone(),
        Some(Err(err)) => {
            reporter.error(rules::STRUCT, root_path, "#", err.to_string());
            return BundleResult {
                document: Value::Null,
                problems: reporter.problems,
                meta: BundleMeta::default(),
            };
        }
        None => {
            reporter.error(rules::STRUCT, root_path, "#", "root document was not loaded");
            return BundleResult {
                document: Value::Null,
                problems: reporter.problems,
                meta: BundleMeta::default(),
            };
        }
    };

    check_structure(&document, root_path, &mut reporter);

    let mut bundler = Bundler {
        sources,
        reporter,
        resolved: HashMap::new(),
        components: Vec::new(),
        dependencies: Vec::new(),
    };
    let mut location = Vec::new();
    bundler.walk(&mut document, root_path, &mut location);

    let Bundler {
        mut reporter,
        components,
        dependencies,
        ..
    } = bundler;

    install_components(&mut document, components);
    check_component_names(&document, root_path, &mut reporter);

    if options.dereference {
        dereference(&mut document);
    }
    if options.remove_unused_components {
        remove_unused_components(&mut document);
    }

    BundleResult {
        document,
        problems: reporter.problems,
        meta: BundleMeta {
            file_dependencies: dependencies,
        },
    }
}

/// Collects problems, applying the configured rule severities.
struct Reporter<'a> {
    config: &'a Config,
    problems: Vec<Problem>,
}

impl<'a> Reporter<'a> {
    fn new(config: &'a Config) -> Self {
        Self {
            config,
            problems: Vec::new(),
        }
    }

    fn report(
        &mut self,
        rule: &str,
        file: &Path,
        pointer: impl Into<String>,
        message: impl Into<String>,
    ) {
        if let Some(severity) = self.config.severity(rule).as_severity() {
            self.problems
                .push(Problem::new(rule, severity, file, pointer, message));
        }
    }

    /// Report regardless of configuration (unparseable input).
    fn error(&mut self, rule: &str, file: &Path, pointer: &str, message: impl Into<String>) {
        self.problems
            .push(Problem::new(rule, Severity::Error, file, pointer, message));
    }
}

/// A component pulled in from another file.
struct Component {
    section: &'static str,
    name: String,
    /// Target as found in its file, used to detect name clashes.
    raw: Value,
    /// Target after its own refs were bundled.
    content: Value,
}

enum Resolution {
    Keep,
    Ref(String),
    Inline(Value),
}

struct Bundler<'a> {
    sources: &'a SourceSet,
    reporter: Reporter<'a>,
    /// (file, pointer) -> internal ref already assigned.
    resolved: HashMap<(PathBuf, String), String>,
    components: Vec<Component>,
    dependencies: Vec<PathBuf>,
}

impl Bundler<'_> {
    /// Walk `value`, which lives in `file` at `location`.
    fn walk(&mut self, value: &mut Value, file: &Path, location: &mut Vec<String>) {
        if let Some(inline) = self.rewrite_ref(value, file, location) {
            *value = inline;
            return;
        }

        match value {
            Value::Mapping(map) => {
                for (key, child) in map.iter_mut() {
                    if key.as_str() == Some("$ref") {
                        continue;
                    }
                    location.push(pointer::key_segment(key));
                    self.walk(child, file, location);
                    location.pop();
                }
            }
            Value::Sequence(seq) => {
                for (index, child) in seq.iter_mut().enumerate() {
                    location.push(index.to_string());
                    self.walk(child, file, location);
                    location.pop();
                }
            }
            Value::Tagged(tagged) => self.walk(&mut tagged.value, file, location),
            _ => {}
        }
    }

    /// Resolve the `$ref` of a reference object, if `value` is one.
    ///
    /// Returns replacement content when the ref must be inlined.
    fn rewrite_ref(&mut self, value: &mut Value, file: &Path, location: &[String]) -> Option<Value> {
        let map = value.as_mapping_mut()?;
        let reference = match map.get("$ref")? {
            Value::String(s) => s.clone(),
            _ => {
                let mut at = location.to_vec();
                at.push("$ref".to_string());
                self.reporter.report(
                    rules::STRUCT,
                    file,
                    pointer::to_fragment(&at),
                    "$ref must be a string",
                );
                return None;
            }
        };

        match self.resolve(&reference, file, location) {
            Resolution::Keep => None,
            Resolution::Ref(internal) => {
                map.insert(Value::String("$ref".to_string()), Value::String(internal));
                None
            }
            Resolution::Inline(content) => Some(content),
        }
    }

    fn resolve(&mut self, reference: &str, file: &Path, location: &[String]) -> Resolution {
        let sources = self.sources;
        let (target_file, target_pointer) = match split_ref(reference) {
            RefTarget::Remote(url) => {
                self.unresolved(file, location, format!("remote $ref is not supported: {}", url));
                return Resolution::Keep;
            }
            RefTarget::Local { pointer } => (file.to_path_buf(), pointer.to_string()),
            RefTarget::File { path, pointer } => (resolve_path(file, path), pointer.to_string()),
        };

        let root = sources.root_path();
        if target_file == root {
            let exists = sources
                .root_document()
                .and_then(|doc| pointer::resolve(doc, &target_pointer))
                .is_some();
            if !exists {
                self.unresolved(file, location, format!("can't resolve $ref {}", reference));
                return Resolution::Keep;
            }
            return if file == root {
                Resolution::Keep
            } else {
                Resolution::Ref(format!("#{}", target_pointer))
            };
        }

        let key = (target_file.clone(), target_pointer.clone());
        if let Some(internal) = self.resolved.get(&key) {
            return Resolution::Ref(internal.clone());
        }

        let target = match sources.get(&target_file) {
            Some(Ok(doc)) => match pointer::resolve(doc, &target_pointer) {
                Some(target) => target.clone(),
                None => {
                    self.unresolved(file, location, format!("can't resolve $ref {}", reference));
                    return Resolution::Keep;
                }
            },
            Some(Err(err)) => {
                self.unresolved(
                    file,
                    location,
                    format!("can't resolve $ref {}: {}", reference, err),
                );
                return Resolution::Keep;
            }
            None => {
                self.unresolved(file, location, format!("can't resolve $ref {}", reference));
                return Resolution::Keep;
            }
        };

        if !self.dependencies.contains(&target_file) {
            self.dependencies.push(target_file.clone());
        }

        let mut inner_location = pointer::segments(&target_pointer).unwrap_or_default();

        if is_path_item_location(location) {
            let mut content = target;
            self.walk(&mut content, &target_file, &mut inner_location);
            return Resolution::Inline(content);
        }

        let section = component_section(location);
        let base_name = component_base_name(&target_file, &inner_location);
        let (name, fresh) = self.allocate_name(section, &base_name, &target);
        let internal = format!("#/components/{}/{}", section, pointer::escape(&name));
        self.resolved.insert(key, internal.clone());

        if fresh {
            let index = self.components.len();
            self.components.push(Component {
                section,
                name,
                raw: target.clone(),
                content: Value::Null,
            });
            let mut content = target;
            self.walk(&mut content, &target_file, &mut inner_location);
            self.components[index].content = content;
        }

        Resolution::Ref(internal)
    }

    fn unresolved(&mut self, file: &Path, location: &[String], message: String) {
        self.reporter.report(
            rules::NO_UNRESOLVED_REFS,
            file,
            pointer::to_fragment(location),
            message,
        );
    }

    /// Pick a free component name, reusing one that already holds `content`.
    ///
    /// Returns the name and whether the component still has to be added.
    fn allocate_name(&self, section: &str, base: &str, content: &Value) -> (String, bool) {
        let mut candidate = base.to_string();
        let mut suffix = 1;
        loop {
            match self.existing_component(section, &candidate) {
                None => return (candidate, true),
                Some(existing) if existing == content => return (candidate, false),
                Some(_) => {
                    suffix += 1;
                    candidate = format!("{}-{}", base, suffix);
                }
            }
        }
    }

    fn existing_component(&self, section: &str, name: &str) -> Option<&Value> {
        let in_root = self
            .sources
            .root_document()
            .and_then(|doc| doc.get("components"))
            .and_then(|c| c.get(section))
            .and_then(|s| s.get(name));
        in_root.or_else(|| {
            self.components
                .iter()
                .find(|c| c.section == section && c.name == name)
                .map(|c| &c.raw)
        })
    }
}

/// Pick the component section for a ref found at `location`.
fn component_section(location: &[String]) -> &'static str {
    let segs: Vec<&str> = location.iter().map(String::as_str).collect();

    if let [.., "components", section, _] = segs.as_slice() {
        if let Some(known) = COMPONENT_SECTIONS.iter().copied().find(|s| s == section) {
            return known;
        }
    }

    if let [.., "requestBody"] = segs.as_slice() {
        return "requestBodies";
    }

    match segs.as_slice() {
        [.., "properties", _, _] => "schemas",
        [.., "parameters", _] => "parameters",
        [.., "responses", _] => "responses",
        [.., "headers", _] => "headers",
        [.., "examples", _] => "examples",
        [.., "links", _] => "links",
        _ => "schemas",
    }
}

fn is_path_item_location(location: &[String]) -> bool {
    matches!(location, [top, _] if top == "paths" || top == "webhooks")
}

/// Name for a bundled component: last pointer segment, or the file stem.
fn component_base_name(file: &Path, pointer_segments: &[String]) -> String {
    match pointer_segments.last() {
        Some(last) if !last.is_empty() => last.clone(),
        _ => file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "component".to_string()),
    }
}

fn install_components(document: &mut Value, components: Vec<Component>) {
    if components.is_empty() {
        return;
    }
    let Some(root) = document.as_mapping_mut() else {
        return;
    };
    let Some(sections) = child_mapping(root, "components") else {
        return;
    };
    for component in components {
        if let Some(section) = child_mapping(sections, component.section) {
            section.insert(Value::String(component.name), component.content);
        }
    }
}

/// Get `map[key]` as a mapping, inserting an empty one when absent.
fn child_mapping<'a>(map: &'a mut Mapping, key: &str) -> Option<&'a mut Mapping> {
    if matches!(map.get(key), None | Some(Value::Null)) {
        map.insert(Value::String(key.to_string()), Value::Mapping(Mapping::new()));
    }
    map.get_mut(key)?.as_mapping_mut()
}

fn check_structure(document: &Value, file: &Path, reporter: &mut Reporter<'_>) {
    let Some(root) = document.as_mapping() else {
        reporter.report(rules::STRUCT, file, "#", "document root must be a mapping");
        return;
    };

    match root.get("openapi") {
        Some(Value::String(version)) if version.starts_with("3.") => {}
        Some(Value::String(version)) => reporter.report(
            rules::STRUCT,
            file,
            "#/openapi",
            format!("unsupported OpenAPI version: {} (only 3.x supported)", version),
        ),
        _ => reporter.report(
            rules::STRUCT,
            file,
            "#",
            "missing or non-string 'openapi' field",
        ),
    }

    match root.get("info") {
        Some(Value::Mapping(info)) => {
            for field in ["title", "version"] {
                if !matches!(info.get(field), Some(Value::String(_))) {
                    reporter.report(
                        rules::STRUCT,
                        file,
                        "#/info",
                        format!("missing or non-string 'info.{}'", field),
                    );
                }
            }
        }
        _ => reporter.report(rules::STRUCT, file, "#", "missing 'info' object"),
    }

    if let Some(paths) = root.get("paths") {
        if !paths.is_mapping() {
            reporter.report(rules::STRUCT, file, "#/paths", "'paths' must be a mapping");
        }
    }
}

fn component_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid regex"))
}

fn check_component_names(document: &Value, file: &Path, reporter: &mut Reporter<'_>) {
    let Some(sections) = document.get("components").and_then(Value::as_mapping) else {
        return;
    };
    for (section, entries) in sections {
        let Some(entries) = entries.as_mapping() else {
            continue;
        };
        let section = pointer::key_segment(section);
        for name in entries.keys() {
            let name = pointer::key_segment(name);
            if !component_name_pattern().is_match(&name) {
                let at = vec!["components".to_string(), section.clone(), name.clone()];
                reporter.report(
                    rules::COMPONENT_NAMES,
                    file,
                    pointer::to_fragment(&at),
                    format!(
                        "component name '{}' should only contain A-Z, a-z, 0-9, '.', '-' and '_'",
                        name
                    ),
                );
            }
        }
    }
}

/// Replace every internal `$ref` with a copy of its target.
///
/// Refs that would recurse into themselves are left in place.
pub fn dereference(document: &mut Value) {
    let snapshot = document.clone();
    let mut stack = Vec::new();
    inline_refs(document, &snapshot, &mut stack);
}

fn local_ref(value: &Value) -> Option<&str> {
    value
        .get("$ref")
        .and_then(Value::as_str)
        .filter(|r| r.starts_with('#'))
}

fn inline_refs(value: &mut Value, root: &Value, stack: &mut Vec<String>) {
    if let Some(reference) = local_ref(value).map(str::to_string) {
        if stack.contains(&reference) {
            return;
        }
        if let Some(target) = pointer::resolve(root, &reference[1..]) {
            let mut target = target.clone();
            stack.push(reference);
            inline_refs(&mut target, root, stack);
            stack.pop();
            *value = target;
        }
        return;
    }

    match value {
        Value::Mapping(map) => {
            for child in map.values_mut() {
                inline_refs(child, root, stack);
            }
        }
        Value::Sequence(seq) => {
            for child in seq.iter_mut() {
                inline_refs(child, root, stack);
            }
        }
        Value::Tagged(tagged) => inline_refs(&mut tagged.value, root, stack),
        _ => {}
    }
}

/// Drop components that are not reachable from outside `components`.
pub fn remove_unused_components(document: &mut Value) {
    let used = reachable_refs(document);

    let Some(sections) = document
        .get_mut("components")
        .and_then(Value::as_mapping_mut)
    else {
        return;
    };

    for section in PRUNABLE_SECTIONS {
        let Some(entries) = sections.get_mut(*section).and_then(Value::as_mapping_mut) else {
            continue;
        };
        let unused: Vec<Value> = entries
            .keys()
            .filter(|name| {
                let internal = format!(
                    "#/components/{}/{}",
                    section,
                    pointer::escape(&pointer::key_segment(name))
                );
                !used.contains(&internal)
            })
            .cloned()
            .collect();
        for name in unused {
            entries.shift_remove(&name);
        }
    }
}

fn reachable_refs(document: &Value) -> HashSet<String> {
    let mut queue: Vec<&str> = Vec::new();
    if let Some(root) = document.as_mapping() {
        for (key, value) in root {
            if key.as_str() != Some("components") {
                collect_refs(value, &mut queue);
            }
        }
    }

    let mut used = HashSet::new();
    while let Some(reference) = queue.pop() {
        if !used.insert(reference.to_string()) {
            continue;
        }
        if let Some(target) = reference
            .strip_prefix('#')
            .and_then(|p| pointer::resolve(document, p))
        {
            collect_refs(target, &mut queue);
        }
    }
    used
}
