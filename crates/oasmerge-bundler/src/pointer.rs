//! JSON pointer helpers over YAML trees.

use serde_yaml::Value;

/// Escape a single pointer segment (`~` -> `~0`, `/` -> `~1`).
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape`].
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Render path segments as a `#/a/b` fragment.
pub fn to_fragment(segments: &[String]) -> String {
    let mut out = String::from("#");
    for segment in segments {
        out.push('/');
        out.push_str(&escape(segment));
    }
    out
}

/// Split a pointer (`/a/b`, no leading `#`) into unescaped segments.
///
/// Returns `None` for a non-empty pointer that does not start with `/`.
pub fn segments(pointer: &str) -> Option<Vec<String>> {
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest = pointer.strip_prefix('/')?;
    Some(rest.split('/').map(unescape).collect())
}

/// String form of a mapping key as it appears in a pointer.
///
/// YAML allows non-string keys (`200:` under `responses` is a number).
pub fn key_segment(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Resolve a pointer (`/a/b`, no leading `#`) against `root`.
pub fn resolve<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    segments(pointer)?
        .iter()
        .try_fold(root, |current, segment| child(current, segment))
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Mapping(map) => map.get(segment).or_else(|| {
            map.iter()
                .find(|(key, _)| !key.is_string() && key_segment(key) == segment)
                .map(|(_, v)| v)
        }),
        Value::Sequence(seq) => segment.parse::<usize>().ok().and_then(|i| seq.get(i)),
        Value::Tagged(tagged) => child(&tagged.value, segment),
        _ => None,
    }
}
