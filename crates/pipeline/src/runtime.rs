//! Runtime observations (query statistics, trace exports) reduced to edge flags.
//!
//! Static verification only proves an edge is plausible. These helpers answer a
//! narrower question from production telemetry: did the service actually read,
//! write or call the target?

use crate::error::{PipelineError, Result};
use crudmap_graph::{EdgeType, Evidence, EvidenceKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

static QUOTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[`"']"#).expect("quote regex must compile"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex must compile"));

static LEADING_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)").expect("leading word regex must compile"));

static URL_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://([^/]+)/").expect("url host regex must compile"));

const PEER_KEYS: [&str; 3] = ["peer.service", "net.peer.name", "peer.service.name"];
const ATTRIBUTE_VALUE_FIELDS: [&str; 4] = ["stringValue", "intValue", "doubleValue", "boolValue"];

/// Edge types seen at runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RuntimeEdgeFlags {
    pub reads: bool,
    pub writes: bool,
    pub calls: bool,
}

impl RuntimeEdgeFlags {
    pub fn merge(self, other: RuntimeEdgeFlags) -> RuntimeEdgeFlags {
        RuntimeEdgeFlags {
            reads: self.reads || other.reads,
            writes: self.writes || other.writes,
            calls: self.calls || other.calls,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.reads || self.writes || self.calls)
    }

    /// Observed types in READS, WRITES, CALLS order
    pub fn edge_types(&self) -> Vec<EdgeType> {
        let mut types = Vec::with_capacity(3);
        if self.reads {
            types.push(EdgeType::Reads);
        }
        if self.writes {
            types.push(EdgeType::Writes);
        }
        if self.calls {
            types.push(EdgeType::Calls);
        }
        types
    }

    pub fn observed(&self, edge_type: EdgeType) -> bool {
        match edge_type {
            EdgeType::Reads => self.reads,
            EdgeType::Writes => self.writes,
            EdgeType::Calls => self.calls,
            _ => false,
        }
    }

    /// Runtime evidence for `edge_type`, `None` when it was never observed.
    ///
    /// `kind` should be [`EvidenceKind::Log`] for query statistics and
    /// [`EvidenceKind::Trace`] for span exports.
    pub fn evidence(
        &self,
        edge_type: EdgeType,
        kind: EvidenceKind,
        locator: impl Into<String>,
        source_tool: impl Into<String>,
    ) -> Option<Evidence> {
        if !self.observed(edge_type) {
            return None;
        }
        Some(
            Evidence::new(kind, locator)
                .with_snippet(format!("observed={edge_type}"))
                .with_tool(source_tool),
        )
    }

    fn all(&self) -> bool {
        self.reads && self.writes && self.calls
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlOperation {
    Read,
    Write,
}

impl SqlOperation {
    fn apply(self, flags: &mut RuntimeEdgeFlags) {
        match self {
            SqlOperation::Read => flags.reads = true,
            SqlOperation::Write => flags.writes = true,
        }
    }
}

/// A table name plus its unqualified suffix, matched on word boundaries.
struct TableTokens {
    tokens: Vec<String>,
    patterns: Vec<Regex>,
}

impl TableTokens {
    fn new(table: &str) -> Result<Option<Self>> {
        let normalized = normalize_identifier(table);
        if normalized.is_empty() {
            return Ok(None);
        }
        let mut tokens = vec![normalized.clone()];
        if let Some((_, suffix)) = normalized.rsplit_once('.') {
            if !suffix.is_empty() {
                tokens.push(suffix.to_string());
            }
        }
        let patterns = tokens
            .iter()
            .map(|token| Regex::new(&format!(r"\b{}\b", regex::escape(token))))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| PipelineError::InvalidPayload(format!("table pattern: {err}")))?;
        Ok(Some(Self { tokens, patterns }))
    }

    fn contains(&self, normalized: &str) -> bool {
        self.tokens.iter().any(|token| token == normalized)
    }

    fn mentioned_in(&self, normalized_sql: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(normalized_sql))
    }
}

/// READS/WRITES flags from `pg_stat_statements` rows (`{"query": ..., "calls": ...}`).
///
/// Rows without a query string or with no positive call count are ignored.
pub fn flags_from_pg_stat_statements(records: &[Value], table: &str) -> Result<RuntimeEdgeFlags> {
    let tokens = TableTokens::new(table)?.ok_or_else(|| {
        PipelineError::InvalidPayload("table must be a non-empty identifier".to_string())
    })?;

    let mut flags = RuntimeEdgeFlags::default();
    for record in records {
        let Some(query) = record.get("query").and_then(Value::as_str) else {
            continue;
        };
        let calls = record.get("calls").and_then(Value::as_f64).unwrap_or(0.0);
        if calls <= 0.0 {
            continue;
        }
        let normalized = normalize_sql(query);
        if !tokens.mentioned_in(&normalized) {
            continue;
        }
        if let Some(operation) = classify_sql(&normalized) {
            operation.apply(&mut flags);
        }
        if flags.reads && flags.writes {
            break;
        }
    }
    log::debug!("pg_stat_statements flags for {table}: {flags:?}");
    Ok(flags)
}

/// READS/WRITES/CALLS flags from an OTLP-style JSON export.
///
/// `payload` is either `{"resourceSpans": [...]}` or the bare resource-span array.
/// With `source_service` set, only resources whose `service.name` matches are read.
/// Table flags need `db_table`; the call flag needs `peer_service`.
pub fn flags_from_otel_spans(
    payload: &Value,
    source_service: Option<&str>,
    db_table: Option<&str>,
    peer_service: Option<&str>,
) -> Result<RuntimeEdgeFlags> {
    let tokens = match db_table {
        Some(table) => TableTokens::new(table)?,
        None => None,
    };
    let peer = peer_service
        .map(normalize_identifier)
        .filter(|peer| !peer.is_empty());
    let source = source_service
        .map(normalize_identifier)
        .filter(|source| !source.is_empty());

    let resource_spans: &[Value] = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("resourceSpans")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    let mut flags = RuntimeEdgeFlags::default();
    for resource_span in resource_spans.iter().filter_map(Value::as_object) {
        if let Some(source) = &source {
            if resource_service(resource_span).as_deref() != Some(source.as_str()) {
                continue;
            }
        }

        for span in spans_of(resource_span) {
            let attributes = attribute_map(span.get("attributes"));
            if attributes.is_empty() {
                continue;
            }

            if let Some(tokens) = &tokens {
                if span_targets_table(&attributes, tokens) {
                    if let Some(operation) = span_operation(&attributes) {
                        operation.apply(&mut flags);
                    }
                }
            }
            if let Some(peer) = &peer {
                let observed = resolve_peer(&attributes).map(normalize_identifier);
                if observed.as_deref() == Some(peer.as_str()) {
                    flags.calls = true;
                }
            }
            if flags.all() {
                return Ok(flags);
            }
        }
    }
    Ok(flags)
}

fn resource_service(resource_span: &Map<String, Value>) -> Option<String> {
    let resource = resource_span.get("resource")?.as_object()?;
    attribute_map(resource.get("attributes"))
        .get("service.name")
        .map(|name| normalize_identifier(name))
}

fn spans_of(resource_span: &Map<String, Value>) -> impl Iterator<Item = &Map<String, Value>> {
    let scopes = resource_span
        .get("scopeSpans")
        .filter(|value| !is_falsy(value))
        .or_else(|| resource_span.get("instrumentationLibrarySpans"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    scopes
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|scope| scope.get("spans").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// `[{"key": k, "value": {"stringValue": v}}, ...]` flattened into `k -> v`.
fn attribute_map(attributes: Option<&Value>) -> BTreeMap<String, String> {
    let mut mapping = BTreeMap::new();
    let Some(attributes) = attributes.and_then(Value::as_array) else {
        return mapping;
    };
    for attribute in attributes.iter().filter_map(Value::as_object) {
        let Some(key) = attribute.get("key").and_then(Value::as_str) else {
            continue;
        };
        if let Some(value) = attribute.get("value").and_then(attribute_value) {
            mapping.insert(key.to_string(), value);
        }
    }
    mapping
}

fn attribute_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(fields) => ATTRIBUTE_VALUE_FIELDS
            .iter()
            .filter_map(|field| fields.get(*field))
            .find(|inner| !inner.is_null())
            .map(|inner| match inner {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }),
        _ => None,
    }
}

fn span_targets_table(attributes: &BTreeMap<String, String>, tokens: &TableTokens) -> bool {
    let table_attribute = ["db.sql.table", "db.name"]
        .iter()
        .filter_map(|key| attributes.get(*key))
        .find(|value| !value.is_empty());
    if let Some(table) = table_attribute {
        if tokens.contains(&normalize_identifier(table)) {
            return true;
        }
    }
    match attributes.get("db.statement").filter(|s| !s.is_empty()) {
        Some(statement) => tokens.mentioned_in(&normalize_sql(statement)),
        None => false,
    }
}

fn span_operation(attributes: &BTreeMap<String, String>) -> Option<SqlOperation> {
    if let Some(operation) = attributes.get("db.operation").filter(|s| !s.is_empty()) {
        match operation.to_lowercase().as_str() {
            "select" | "fetch" | "query" => return Some(SqlOperation::Read),
            "insert" | "update" | "delete" | "merge" => return Some(SqlOperation::Write),
            _ => {}
        }
    }
    attributes
        .get("db.statement")
        .filter(|s| !s.is_empty())
        .and_then(|statement| classify_sql(&normalize_sql(statement)))
}

fn resolve_peer(attributes: &BTreeMap<String, String>) -> Option<&str> {
    let non_empty = |key: &str| attributes.get(key).map(String::as_str).filter(|v| !v.is_empty());
    if let Some(peer) = PEER_KEYS.iter().find_map(|key| non_empty(*key)) {
        return Some(peer);
    }
    if let Some(host) = non_empty("http.host") {
        return Some(host);
    }
    let url = non_empty("http.url")?;
    URL_HOST
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|host| host.as_str())
}

fn normalize_identifier(identifier: &str) -> String {
    QUOTES.replace_all(identifier, "").trim().to_lowercase()
}

fn normalize_sql(sql: &str) -> String {
    let stripped = QUOTES.replace_all(sql, "");
    WHITESPACE
        .replace_all(&stripped, " ")
        .trim()
        .to_lowercase()
}

fn classify_sql(normalized_sql: &str) -> Option<SqlOperation> {
    let keyword = LEADING_WORD.captures(normalized_sql)?.get(1)?.as_str();
    match keyword {
        "select" | "show" | "with" => Some(SqlOperation::Read),
        "insert" | "update" | "delete" | "merge" => Some(SqlOperation::Write),
        _ => None,
    }
}
