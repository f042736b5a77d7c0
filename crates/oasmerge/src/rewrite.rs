//! The `x-ref-schema-name` convention.
//!
//! A spec whose item schema lives in an external `schema.json` bundles into a
//! component literally named `schema`. Every spec does this, so the name would
//! collide on merge. `info.x-ref-schema-name: Widget` renames it to
//! `WidgetItem` before merging.

use serde_yaml::{Mapping, Value};

/// Internal ref produced by bundling an external `schema.json`.
pub const SCHEMA_REF: &str = "#/components/schemas/schema";

/// Extension key under `info` naming the item schema.
pub const SCHEMA_NAME_KEY: &str = "x-ref-schema-name";

/// The item schema name declared by a document, if any.
pub fn declared_schema_name(document: &Value) -> Option<&str> {
    document
        .get("info")?
        .get(SCHEMA_NAME_KEY)?
        .as_str()
        .filter(|name| !name.is_empty())
}

/// Rewrite the `schema` component of `document` to `{name}Item`.
///
/// Returns whether the document declared a name.
pub fn rewrite_schema_refs(document: &mut Value) -> bool {
    let Some(name) = declared_schema_name(document).map(str::to_string) else {
        return false;
    };
    let item = format!("{}Item", name);
    let item_ref = format!("#/components/schemas/{}", item);

    if let Some(schemas) = document
        .get_mut("components")
        .and_then(|c| c.get_mut("schemas"))
        .and_then(Value::as_mapping_mut)
    {
        promote_schema(schemas, &item);
    }

    replace_refs(document, &item_ref);
    true
}

/// Replace a `{item}: {$ref: schema}` indirection with the schema itself.
fn promote_schema(schemas: &mut Mapping, item: &str) {
    let points_at_schema = schemas
        .get(item)
        .and_then(|v| v.get("$ref"))
        .and_then(Value::as_str)
        == Some(SCHEMA_REF);
    if !points_at_schema || !schemas.contains_key("schema") {
        return;
    }

    if let Some(schema) = schemas.shift_remove("schema") {
        if let Some(slot) = schemas.get_mut(item) {
            *slot = schema;
        }
    }
}

fn replace_refs(value: &mut Value, item_ref: &str) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map.iter_mut() {
                if key.as_str() == Some("$ref") && child.as_str() == Some(SCHEMA_REF) {
                    *child = Value::String(item_ref.to_string());
                } else {
                    replace_refs(child, item_ref);
                }
            }
        }
        Value::Sequence(seq) => {
            for child in seq {
                replace_refs(child, item_ref);
            }
        }
        Value::Tagged(tagged) => replace_refs(&mut tagged.value, item_ref),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn promotes_item_and_removes_schema() {
        let mut document = doc(
            r#"
openapi: 3.0.3
info:
  title: Widgets
  version: "1"
  x-ref-schema-name: Widget
paths:
  /widgets:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/schema'
components:
  schemas:
    Error:
      type: object
    WidgetItem:
      $ref: '#/components/schemas/schema'
    schema:
      type: object
      properties:
        id:
          type: string
"#,
        );

        assert!(rewrite_schema_refs(&mut document));

        let schemas = document["components"]["schemas"].as_mapping().unwrap();
        assert!(!schemas.contains_key("schema"));
        assert_eq!(
            document["components"]["schemas"]["WidgetItem"]["type"].as_str(),
            Some("object")
        );
        let names: Vec<&str> = schemas.keys().filter_map(Value::as_str).collect();
        assert_eq!(names, vec!["Error", "WidgetItem"]);

        let items = &document["paths"]["/widgets"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"]["items"];
        assert_eq!(
            items["$ref"].as_str(),
            Some("#/components/schemas/WidgetItem")
        );
    }

    #[test]
    fn rewrites_refs_without_item_entry() {
        let mut document = doc(
            r#"
info:
  x-ref-schema-name: Widget
paths:
  /a:
    $ref: '#/components/schemas/schema'
  /b:
    parameters:
      - $ref: '#/components/schemas/schemaX'
components:
  schemas:
    schema:
      type: string
"#,
        );

        assert!(rewrite_schema_refs(&mut document));
        assert_eq!(
            document["paths"]["/a"]["$ref"].as_str(),
            Some("#/components/schemas/WidgetItem")
        );
        assert_eq!(
            document["paths"]["/b"]["parameters"][0]["$ref"].as_str(),
            Some("#/components/schemas/schemaX")
        );
        assert_eq!(
            document["components"]["schemas"]["schema"]["type"].as_str(),
            Some("string")
        );
    }

    #[test]
    fn item_pointing_elsewhere_is_kept() {
        let mut document = doc(
            r#"
info:
  x-ref-schema-name: Widget
components:
  schemas:
    WidgetItem:
      $ref: '#/components/schemas/Other'
    schema:
      type: string
"#,
        );

        rewrite_schema_refs(&mut document);
        let schemas = &document["components"]["schemas"];
        assert_eq!(
            schemas["WidgetItem"]["$ref"].as_str(),
            Some("#/components/schemas/Other")
        );
        assert!(schemas.get("schema").is_some());
    }

    #[test]
    fn no_name_leaves_document_unchanged() {
        let original = doc(
            r#"
info:
  title: x
components:
  schemas:
    Item:
      $ref: '#/components/schemas/schema'
    schema:
      type: string
"#,
        );
        let mut document = original.clone();
        assert!(!rewrite_schema_refs(&mut document));
        assert_eq!(document, original);
    }

    #[test]
    fn empty_or_non_string_name_is_ignored() {
        let original = doc("info:\n  x-ref-schema-name: ''\na:\n  $ref: '#/components/schemas/schema'\n");
        let mut document = original.clone();
        assert!(!rewrite_schema_refs(&mut document));
        assert_eq!(document, original);

        let original = doc("info:\n  x-ref-schema-name: 42\na:\n  $ref: '#/components/schemas/schema'\n");
        let mut document = original.clone();
        assert!(!rewrite_schema_refs(&mut document));
        assert_eq!(document, original);
    }

    #[test]
    fn ref_value_only_matches_exactly() {
        let mut document = doc(
            r#"
info:
  x-ref-schema-name: Widget
a:
  $ref: '#/components/schemas/schema/properties/id'
b:
  description: '#/components/schemas/schema'
"#,
        );
        rewrite_schema_refs(&mut document);
        assert_eq!(
            document["a"]["$ref"].as_str(),
            Some("#/components/schemas/schema/properties/id")
        );
        assert_eq!(
            document["b"]["description"].as_str(),
            Some("#/components/schemas/schema")
        );
    }
}
