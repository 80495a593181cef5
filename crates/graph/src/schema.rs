use crate::error::{GraphError, Result};
use crate::types::{GraphDocument, DEFAULT_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const GRAPH_SCHEMA_ID: &str = "https://schemas.crudmap.dev/graph.json";
const SCHEMA_DRAFT_URL: &str = "https://json-schema.org/draft/2020-12/schema";
const COMBINATORS: [&str; 3] = ["anyOf", "allOf", "oneOf"];
const MAX_DEPTH: usize = 32;

/// JSON Schema (draft 2020-12) for the persisted graph document.
pub fn graph_json_schema() -> Value {
    let schema = schemars::schema_for!(GraphDocument);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| Value::Object(Map::new()));

    if let Value::Object(root) = &mut value {
        root.entry("$schema")
            .or_insert_with(|| Value::String(SCHEMA_DRAFT_URL.to_string()));
        root.insert("title".to_string(), Value::String("CrudGraph".to_string()));
        root.entry("$id")
            .or_insert_with(|| Value::String(GRAPH_SCHEMA_ID.to_string()));

        if let Some(Value::Object(version)) = root
            .get_mut("properties")
            .and_then(|properties| properties.get_mut("schema_version"))
        {
            version.insert(
                "const".to_string(),
                Value::String(DEFAULT_SCHEMA_VERSION.to_string()),
            );
            version.entry("description").or_insert_with(|| {
                Value::String(
                    "Version of the crudmap graph schema this document conforms to.".to_string(),
                )
            });
        }
    }

    value
}

/// Write the graph schema as pretty JSON and return it.
pub fn write_graph_schema(path: &Path) -> Result<Value> {
    let schema = graph_json_schema();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&schema)?)?;
    Ok(schema)
}

/// A potentially breaking difference between two schema revisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChange {
    /// Dotted field path; array items are suffixed with `[]`
    pub path: String,
    pub change_type: String,
    pub detail: String,
}

impl SchemaChange {
    fn new(path: &str, change_type: &str, detail: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            change_type: change_type.to_string(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldSnapshot {
    types: Vec<String>,
    required: bool,
}

/// Compare two schemas field by field.
///
/// Removed fields, type changes and requiredness changes are reported per path, followed
/// by added fields in path order.
pub fn detect_breaking_changes(old_schema: &Value, new_schema: &Value) -> Result<Vec<SchemaChange>> {
    let old_fields = collect_fields(old_schema)?;
    let new_fields = collect_fields(new_schema)?;
    let mut changes = Vec::new();

    for (path, old) in &old_fields {
        let Some(new) = new_fields.get(path) else {
            changes.push(SchemaChange::new(path, "field_removed", "Field was removed from schema."));
            continue;
        };
        if old.types != new.types {
            changes.push(SchemaChange::new(
                path,
                "type_changed",
                format!(
                    "Field type changed from ({}) to ({}).",
                    old.types.join(", "),
                    new.types.join(", ")
                ),
            ));
        }
        if old.required && !new.required {
            changes.push(SchemaChange::new(
                path,
                "required_relaxed",
                "Field changed from required to optional.",
            ));
        }
        if !old.required && new.required {
            changes.push(SchemaChange::new(
                path,
                "required_added",
                "Field changed from optional to required.",
            ));
        }
    }

    for path in new_fields.keys().filter(|path| !old_fields.contains_key(*path)) {
        changes.push(SchemaChange::new(path, "field_added", "New field added to schema."));
    }

    Ok(changes)
}

fn collect_fields(schema: &Value) -> Result<BTreeMap<String, FieldSnapshot>> {
    let resolver = Resolver {
        definitions: schema.get("$defs").and_then(Value::as_object),
    };
    let mut fields = BTreeMap::new();
    resolver.collect(schema, "", None, &mut fields, 0)?;
    Ok(fields)
}

struct Resolver<'a> {
    definitions: Option<&'a Map<String, Value>>,
}

impl<'a> Resolver<'a> {
    fn resolve(&self, node: &'a Value) -> Result<&'a Value> {
        let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
            return Ok(node);
        };
        let key = reference.strip_prefix("#/$defs/").ok_or_else(|| {
            GraphError::SchemaError(format!("Unsupported $ref target: {reference}"))
        })?;
        self.definitions
            .and_then(|defs| defs.get(key))
            .ok_or_else(|| {
                GraphError::SchemaError(format!("Unresolved schema definition: {reference}"))
            })
    }

    fn collect(
        &self,
        node: &'a Value,
        path: &str,
        required: Option<bool>,
        into: &mut BTreeMap<String, FieldSnapshot>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(GraphError::SchemaError(format!(
                "Schema nesting exceeds {MAX_DEPTH} levels at '{path}'"
            )));
        }
        let resolved = self.resolve(node)?;

        match resolved.get("type").and_then(Value::as_str) {
            Some("object") => self.collect_object(resolved, path, into, depth)?,
            Some("array") => self.collect_array(resolved, path, required, into, depth)?,
            _ => {}
        }

        for keyword in COMBINATORS {
            if let Some(variants) = resolved.get(keyword).and_then(Value::as_array) {
                for variant in variants.iter().filter(|v| v.is_object()) {
                    self.collect(variant, path, required, into, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn collect_object(
        &self,
        schema: &'a Value,
        path: &str,
        into: &mut BTreeMap<String, FieldSnapshot>,
        depth: usize,
    ) -> Result<()> {
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };
        let required_fields: BTreeSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for (name, child) in properties.iter().filter(|(_, child)| child.is_object()) {
            let child_path = if path.is_empty() {
                name.clone()
            } else {
                format!("{path}.{name}")
            };
            let is_required = required_fields.contains(name.as_str());
            into.insert(
                child_path.clone(),
                FieldSnapshot {
                    types: self.describe(child, 0)?,
                    required: is_required,
                },
            );
            self.collect(child, &child_path, Some(is_required), into, depth + 1)?;
        }
        Ok(())
    }

    fn collect_array(
        &self,
        schema: &'a Value,
        path: &str,
        required: Option<bool>,
        into: &mut BTreeMap<String, FieldSnapshot>,
        depth: usize,
    ) -> Result<()> {
        let Some(items) = schema.get("items").filter(|items| items.is_object()) else {
            return Ok(());
        };
        let item_path = format!("{path}[]");
        into.insert(
            item_path.clone(),
            FieldSnapshot {
                types: self.describe(items, 0)?,
                required: required.unwrap_or(false),
            },
        );
        self.collect(items, &item_path, required, into, depth + 1)
    }

    /// Sorted, de-duplicated type labels of a schema node
    fn describe(&self, node: &'a Value, depth: usize) -> Result<Vec<String>> {
        if depth > MAX_DEPTH {
            return Err(GraphError::SchemaError(format!(
                "Schema nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        let node = self.resolve(node)?;
        let mut types = BTreeSet::new();

        match node.get("type") {
            Some(Value::String(single)) => {
                types.insert(single.clone());
            }
            Some(Value::Array(many)) => {
                types.extend(many.iter().map(value_label));
            }
            _ => {}
        }

        for keyword in COMBINATORS {
            if let Some(variants) = node.get(keyword).and_then(Value::as_array) {
                for variant in variants.iter().filter(|v| v.is_object()) {
                    types.extend(self.describe(variant, depth + 1)?);
                }
            }
        }

        if let Some(values) = node.get("enum").and_then(Value::as_array) {
            let mut labels: Vec<String> = values.iter().map(value_label).collect();
            labels.sort();
            types.insert(format!("enum({})", labels.join(",")));
        }

        if types.is_empty() {
            if let Some(constant) = node.get("const") {
                types.insert(format!("const({constant})"));
            }
        }

        Ok(types.into_iter().collect())
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
