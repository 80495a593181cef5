//! # crudmap graph
//!
//! Evidence-backed dependency graph between services and the data they touch.
//!
//! ## Features
//!
//! - **Canonical model** - namespaced nodes, typed edges, typed evidence
//! - **Strict invariants** - unique node ids and resolvable edge endpoints, checked on
//!   construction and on deserialization
//! - **Confidence scoring** - calibrated score from an evidence set
//! - **Deterministic merge** - union of graphs from several sources
//! - **Persistence** - JSON document, NDJSON records and a JSON Schema contract
//!
//! ## Architecture
//!
//! ```text
//! Evidence[] ──> calculate_confidence ──> ConfidenceResult
//!
//! Node[] + Edge[]
//!     │
//!     ├──> Graph::new (validation)
//!     │      ├─ duplicate ids rejected
//!     │      └─ dangling endpoints rejected
//!     │
//!     ├──> merge_graphs (union by id / (from, to, type))
//!     ├──> DependencyView (petgraph index: readers, writers, tables)
//!     └──> export (JSON, NDJSON) + schema (JSON Schema, breaking changes)
//! ```

mod error;
mod export;
mod merge;
mod schema;
mod scoring;
mod types;
mod view;

pub use error::{GraphError, Result};
pub use export::{ndjson_records, to_json_string, to_ndjson_string, write_json, write_ndjson};
pub use merge::merge_graphs;
pub use schema::{
    detect_breaking_changes, graph_json_schema, write_graph_schema, SchemaChange, GRAPH_SCHEMA_ID,
};
pub use scoring::{
    calculate_confidence, ConfidenceContribution, ConfidenceResult, CONFIRMED_THRESHOLD,
    MULTI_TOOL_AGREEMENT_THRESHOLD, MULTI_TOOL_BONUS, NAME_COLLISION_PENALTY, RUNTIME_BONUS,
    STATIC_BONUS,
};
pub use types::{
    Edge, EdgeType, Evidence, EvidenceFingerprint, EvidenceKind, Graph, GraphDocument, Node, NodeType,
    DEFAULT_SCHEMA_VERSION,
};
pub use view::DependencyView;
