//! Merging bundled documents into one.
//!
//! Top-level fields follow these rules:
//! - `openapi`, `info` and unknown keys come from the first document that has them
//! - `servers` and `security` are concatenated without duplicates
//! - `tags` are unioned by name
//! - `paths` are unioned per operation
//! - `components` are unioned per section and name
//!
//! A `null` section counts as empty. Keys keep the order in which they were
//! first seen.

use serde_yaml::{Mapping, Value};

use crate::error::MergeError;
use crate::rewrite::SCHEMA_NAME_KEY;

/// Operation keys of a path item.
const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Merge documents in order. The first document sets `openapi` and `info`.
pub fn merge_documents(documents: Vec<Value>) -> Result<Value, MergeError> {
    if documents.is_empty() {
        return Err(MergeError::Empty);
    }

    let mut merged = Mapping::new();
    for (index, document) in documents.into_iter().enumerate() {
        let Value::Mapping(document) = document else {
            return Err(MergeError::InvalidDocument { index });
        };

        for (key, value) in document {
            let Some(existing) = merged.get_mut(&key) else {
                let value = match key.as_str() {
                    Some("info") => strip_schema_name(value),
                    _ => value,
                };
                merged.insert(key, value);
                continue;
            };

            match key.as_str() {
                Some(section @ ("servers" | "security")) => {
                    append_unique(section, existing, value)?
                }
                Some("tags") => union_tags(existing, value)?,
                Some("paths") => merge_paths(existing, value)?,
                Some("components") => merge_components(existing, value)?,
                _ => {}
            }
        }
    }

    Ok(Value::Mapping(merged))
}

fn strip_schema_name(mut info: Value) -> Value {
    if let Some(map) = info.as_mapping_mut() {
        map.shift_remove(SCHEMA_NAME_KEY);
    }
    info
}

/// Settle the null cases of a section merge.
///
/// An empty (`null`) section on either side contributes nothing, so the other
/// side is kept. Returns the incoming value only when both sides hold content.
fn absorb_null(existing: &mut Value, incoming: Value) -> Option<Value> {
    if incoming.is_null() {
        return None;
    }
    if existing.is_null() {
        *existing = incoming;
        return None;
    }
    Some(incoming)
}

fn mismatch(key: &str) -> MergeError {
    MergeError::SectionMismatch {
        key: key.to_string(),
    }
}

fn append_unique(key: &str, existing: &mut Value, incoming: Value) -> Result<(), MergeError> {
    let Some(incoming) = absorb_null(existing, incoming) else {
        return Ok(());
    };
    let (Some(list), Value::Sequence(incoming)) = (existing.as_sequence_mut(), incoming) else {
        return Err(mismatch(key));
    };
    for entry in incoming {
        if !list.contains(&entry) {
            list.push(entry);
        }
    }
    Ok(())
}

fn union_tags(existing: &mut Value, incoming: Value) -> Result<(), MergeError> {
    let Some(incoming) = absorb_null(existing, incoming) else {
        return Ok(());
    };
    let (Some(tags), Value::Sequence(incoming)) = (existing.as_sequence_mut(), incoming) else {
        return Err(mismatch("tags"));
    };
    for tag in incoming {
        let known = match tag.get("name") {
            Some(name) => tags.iter().any(|t| t.get("name") == Some(name)),
            None => tags.contains(&tag),
        };
        if !known {
            tags.push(tag);
        }
    }
    Ok(())
}

fn merge_paths(existing: &mut Value, incoming: Value) -> Result<(), MergeError> {
    let Some(incoming) = absorb_null(existing, incoming) else {
        return Ok(());
    };
    let (Some(paths), Value::Mapping(incoming)) = (existing.as_mapping_mut(), incoming) else {
        return Err(mismatch("paths"));
    };

    for (path, item) in incoming {
        let Some(current) = paths.get_mut(&path) else {
            paths.insert(path, item);
            continue;
        };
        let name = path.as_str().unwrap_or_default().to_string();
        merge_path_item(&name, current, item)?;
    }
    Ok(())
}

fn merge_path_item(path: &str, existing: &mut Value, incoming: Value) -> Result<(), MergeError> {
    if *existing == incoming {
        return Ok(());
    }
    let (Some(item), Value::Mapping(incoming)) = (existing.as_mapping_mut(), incoming) else {
        return Err(conflict(path, "path item is not a mapping".to_string()));
    };

    for (key, value) in incoming {
        let is_method = key
            .as_str()
            .is_some_and(|k| HTTP_METHODS.contains(&k.to_ascii_lowercase().as_str()));
        let label = key.as_str().unwrap_or_default().to_string();

        match item.get(&key) {
            None => {
                item.insert(key, value);
            }
            Some(_) if is_method => {
                return Err(conflict(
                    path,
                    format!("operation '{}' is defined more than once", label),
                ));
            }
            Some(current) if *current == value => {}
            Some(_) => {
                return Err(conflict(path, format!("'{}' differs between documents", label)));
            }
        }
    }
    Ok(())
}

fn conflict(path: &str, detail: String) -> MergeError {
    MergeError::PathConflict {
        path: path.to_string(),
        detail,
    }
}

fn merge_components(existing: &mut Value, incoming: Value) -> Result<(), MergeError> {
    let Some(incoming) = absorb_null(existing, incoming) else {
        return Ok(());
    };
    let (Some(sections), Value::Mapping(incoming)) = (existing.as_mapping_mut(), incoming) else {
        return Err(mismatch("components"));
    };

    for (section, entries) in incoming {
        let section_name = section.as_str().unwrap_or_default().to_string();
        let Some(current) = sections.get_mut(&section) else {
            sections.insert(section, entries);
            continue;
        };
        let Some(entries) = absorb_null(current, entries) else {
            continue;
        };
        let (Some(current), Value::Mapping(entries)) = (current.as_mapping_mut(), entries) else {
            return Err(mismatch(&format!("components.{}", section_name)));
        };

        for (name, definition) in entries {
            match current.get(&name) {
                None => {
                    current.insert(name, definition);
                }
                Some(known) if *known == definition => {}
                Some(_) => {
                    return Err(MergeError::ComponentConflict {
                        section: section_name,
                        name: name.as_str().unwrap_or_default().to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}
