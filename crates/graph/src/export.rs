use crate::error::Result;
use crate::types::Graph;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Pretty JSON document with sorted keys and a trailing newline.
pub fn to_json_string(graph: &Graph) -> Result<String> {
    let value = sort_keys(serde_json::to_value(graph)?);
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    Ok(out)
}

/// Records in emission order: one `graph` header, then every node, then every edge.
pub fn ndjson_records(graph: &Graph) -> Result<Vec<Value>> {
    let mut records = Vec::with_capacity(1 + graph.node_count() + graph.edge_count());
    records.push(json!({
        "record_type": "graph",
        "graph": {
            "schema_version": graph.schema_version(),
            "node_count": graph.node_count(),
            "edge_count": graph.edge_count(),
        },
    }));
    for node in graph.nodes() {
        records.push(json!({ "record_type": "node", "node": serde_json::to_value(node)? }));
    }
    for edge in graph.edges() {
        records.push(json!({ "record_type": "edge", "edge": serde_json::to_value(edge)? }));
    }
    Ok(records)
}

/// One compact JSON record per line, keys sorted.
pub fn to_ndjson_string(graph: &Graph) -> Result<String> {
    let mut out = String::new();
    for record in ndjson_records(graph)? {
        out.push_str(&serde_json::to_string(&sort_keys(record))?);
        out.push('\n');
    }
    Ok(out)
}

pub fn write_json(graph: &Graph, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, to_json_string(graph)?)?;
    log::debug!("Wrote graph JSON to {}", path.display());
    Ok(())
}

pub fn write_ndjson(graph: &Graph, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, to_ndjson_string(graph)?)?;
    log::debug!("Wrote graph NDJSON to {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

// serde_json may be built with `preserve_order`; rebuild objects in key order regardless.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
