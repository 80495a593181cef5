use crate::error::{GraphError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Schema version stamped on every graph unless a caller overrides it.
pub const DEFAULT_SCHEMA_VERSION: &str = "0.1.0";

/// Node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum NodeType {
    Service,
    #[serde(rename = "APIEndpoint")]
    ApiEndpoint,
    #[serde(rename = "DBTable")]
    DbTable,
    #[serde(rename = "DBColumn")]
    DbColumn,
    Topic,
    CacheKeyPattern,
    GatewayRoute,
    #[serde(rename = "IaCResource")]
    IacResource,
    BuildTarget,
    Dataset,
}

impl NodeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::Service => "Service",
            NodeType::ApiEndpoint => "APIEndpoint",
            NodeType::DbTable => "DBTable",
            NodeType::DbColumn => "DBColumn",
            NodeType::Topic => "Topic",
            NodeType::CacheKeyPattern => "CacheKeyPattern",
            NodeType::GatewayRoute => "GatewayRoute",
            NodeType::IacResource => "IaCResource",
            NodeType::BuildTarget => "BuildTarget",
            NodeType::Dataset => "Dataset",
        }
    }
}

/// Relationship between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Service reads rows from a table
    Reads,
    /// Service inserts, updates or deletes rows
    Writes,
    Calls,
    Publishes,
    Consumes,
    RoutesTo,
    DependsOn,
    Generates,
    DerivesFrom,
}

impl EdgeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            EdgeType::Reads => "READS",
            EdgeType::Writes => "WRITES",
            EdgeType::Calls => "CALLS",
            EdgeType::Publishes => "PUBLISHES",
            EdgeType::Consumes => "CONSUMES",
            EdgeType::RoutesTo => "ROUTES_TO",
            EdgeType::DependsOn => "DEPENDS_ON",
            EdgeType::Generates => "GENERATES",
            EdgeType::DerivesFrom => "DERIVES_FROM",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin category of a piece of evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Code,
    Spec,
    Log,
    Trace,
    Config,
}

impl EvidenceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EvidenceKind::Code => "code",
            EvidenceKind::Spec => "spec",
            EvidenceKind::Log => "log",
            EvidenceKind::Trace => "trace",
            EvidenceKind::Config => "config",
        }
    }

    /// Static analysis sources: code hits, spec diffs, configuration/introspection facts.
    pub const fn is_static(self) -> bool {
        matches!(self, EvidenceKind::Code | EvidenceKind::Spec | EvidenceKind::Config)
    }

    /// Observed at runtime: log records and trace spans.
    pub const fn is_runtime(self) -> bool {
        matches!(self, EvidenceKind::Log | EvidenceKind::Trace)
    }
}

/// Proof unit backing an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: EvidenceKind,

    /// Where the proof lives (`path:L12`, `db:public.orders`, ...)
    pub locator: String,

    #[serde(default)]
    pub snippet: Option<String>,

    /// Tool that produced the evidence; distinct tools count toward agreement
    #[serde(default)]
    pub source_tool: Option<String>,
}

/// Identity used to drop duplicate evidence when merging.
pub type EvidenceFingerprint<'a> = (EvidenceKind, &'a str, Option<&'a str>, Option<&'a str>);

impl Evidence {
    pub fn new(kind: EvidenceKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
            snippet: None,
            source_tool: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.source_tool = Some(tool.into());
        self
    }

    pub fn fingerprint(&self) -> EvidenceFingerprint<'_> {
        (
            self.kind,
            self.locator.as_str(),
            self.snippet.as_deref(),
            self.source_tool.as_deref(),
        )
    }
}

/// Vertex in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    /// Namespaced id, e.g. `service:OrderAPI` or `table:public:orders`
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    pub name: String,

    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    pub fn service_id(service: &str) -> String {
        format!("service:{service}")
    }

    pub fn table_id(table: &str, schema: Option<&str>) -> String {
        format!("table:{}:{}", schema.unwrap_or("default"), table)
    }
}

/// Directed, typed, evidence-carrying edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,

    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    #[serde(default)]
    pub evidence: Vec<Evidence>,

    /// Calibrated confidence in [0, 1]
    pub confidence: f64,
}

impl Edge {
    pub fn new(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        edge_type: EdgeType,
        confidence: f64,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            edge_type,
            evidence: Vec::new(),
            confidence,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<Evidence>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Identity used for edge union: (from, to, type)
    pub fn key(&self) -> (&str, &str, EdgeType) {
        (self.from_id.as_str(), self.to_id.as_str(), self.edge_type)
    }

    pub fn describe(&self) -> String {
        format!("{} -> {} ({})", self.from_id, self.to_id, self.edge_type)
    }
}

/// Plain serialized form of a [`Graph`], also the source of the JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_schema_version() -> String {
    DEFAULT_SCHEMA_VERSION.to_string()
}

/// Validated dependency graph.
///
/// Node ids are unique and every edge endpoint names an existing node. Both are checked
/// whenever a graph is built, including when it is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphDocument", into = "GraphDocument")]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    schema_version: String,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        Self::with_schema_version(nodes, edges, DEFAULT_SCHEMA_VERSION)
    }

    pub fn with_schema_version(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        schema_version: impl Into<String>,
    ) -> Result<Self> {
        validate(&nodes, &edges)?;
        Ok(Self {
            nodes,
            edges,
            schema_version: schema_version.into(),
        })
    }

    /// Canonical empty graph
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            schema_version: default_schema_version(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>, String) {
        (self.nodes, self.edges, self.schema_version)
    }

    /// First edge without evidence, if any
    pub fn first_unevidenced_edge(&self) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.evidence.is_empty())
    }

    /// Fails on the first edge that carries no evidence.
    pub fn ensure_evidence(&self) -> Result<()> {
        match self.first_unevidenced_edge() {
            Some(edge) => Err(GraphError::MissingEvidence {
                from_id: edge.from_id.clone(),
                to_id: edge.to_id.clone(),
                edge_type: edge.edge_type.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<GraphDocument> for Graph {
    type Error = GraphError;

    fn try_from(document: GraphDocument) -> Result<Self> {
        Self::with_schema_version(document.nodes, document.edges, document.schema_version)
    }
}

impl From<Graph> for GraphDocument {
    fn from(graph: Graph) -> Self {
        Self {
            nodes: graph.nodes,
            edges: graph.edges,
            schema_version: graph.schema_version,
        }
    }
}

fn validate(nodes: &[Node], edges: &[Edge]) -> Result<()> {
    let mut node_ids: HashSet<&str> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(GraphError::DuplicateNode(node.id.clone()));
        }
    }

    let mut missing_sources = BTreeSet::new();
    let mut missing_targets = BTreeSet::new();
    for edge in edges {
        if !node_ids.contains(edge.from_id.as_str()) {
            missing_sources.insert(edge.from_id.clone());
        }
        if !node_ids.contains(edge.to_id.as_str()) {
            missing_targets.insert(edge.to_id.clone());
        }
    }
    if !missing_sources.is_empty() || !missing_targets.is_empty() {
        return Err(GraphError::DanglingEdges {
            missing_sources: missing_sources.into_iter().collect(),
            missing_targets: missing_targets.into_iter().collect(),
        });
    }

    for edge in edges {
        if !(0.0..=1.0).contains(&edge.confidence) {
            return Err(GraphError::ConfidenceOutOfRange {
                from_id: edge.from_id.clone(),
                to_id: edge.to_id.clone(),
                confidence: edge.confidence,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn service() -> Node {
        Node::new("service:OrderAPI", NodeType::Service, "OrderAPI")
    }

    fn table() -> Node {
        Node::new("table:default:orders", NodeType::DbTable, "orders")
    }

    #[test]
    fn valid_graph_builds() {
        let edge = Edge::new("service:OrderAPI", "table:default:orders", EdgeType::Writes, 0.8);
        let graph = Graph::new(vec![service(), table()], vec![edge]).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.schema_version(), DEFAULT_SCHEMA_VERSION);
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let err = Graph::new(vec![service(), service()], Vec::new()).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode(ref id) if id == "service:OrderAPI"));
    }

    #[test]
    fn dangling_edges_cite_missing_ids() {
        let edge = Edge::new("service:Ghost", "table:default:missing", EdgeType::Reads, 0.5);
        let err = Graph::new(vec![service()], vec![edge]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown source nodes: service:Ghost"), "{message}");
        assert!(message.contains("unknown target nodes: table:default:missing"), "{message}");
    }

    #[test]
    fn confidence_outside_unit_interval_is_rejected() {
        let edge = Edge::new("service:OrderAPI", "table:default:orders", EdgeType::Reads, 1.5);
        let err = Graph::new(vec![service(), table()], vec![edge]).unwrap_err();
        assert!(matches!(err, GraphError::ConfidenceOutOfRange { .. }));
    }

    #[test]
    fn deserialization_enforces_invariants() {
        let raw = r#"{
            "nodes": [{"id": "service:A", "type": "Service", "name": "A"}],
            "edges": [{"from_id": "service:A", "to_id": "table:default:t", "type": "READS", "confidence": 0.9}]
        }"#;
        let err = serde_json::from_str::<Graph>(raw).unwrap_err();
        assert!(err.to_string().contains("table:default:t"));
    }

    #[test]
    fn wire_names_match_the_document_format() {
        let edge = Edge::new("service:OrderAPI", "table:default:orders", EdgeType::RoutesTo, 0.4)
            .with_evidence(vec![Evidence::new(EvidenceKind::Code, "src/a.py:L3").with_tool("rg")]);
        let graph = Graph::new(vec![service(), table()], vec![edge]).unwrap();
        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(value["schema_version"], "0.1.0");
        assert_eq!(value["nodes"][1]["type"], "DBTable");
        assert_eq!(value["edges"][0]["type"], "ROUTES_TO");
        assert_eq!(value["edges"][0]["evidence"][0]["type"], "code");
        assert_eq!(value["edges"][0]["evidence"][0]["source_tool"], "rg");

        let back: Graph = serde_json::from_value(value).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn ensure_evidence_cites_first_offending_edge() {
        let bare = Edge::new("service:OrderAPI", "table:default:orders", EdgeType::Writes, 0.9);
        let graph = Graph::new(vec![service(), table()], vec![bare]).unwrap();
        let err = graph.ensure_evidence().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Graph edge is missing evidence: service:OrderAPI -> table:default:orders (WRITES)"
        );
    }
}
