use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph nodes must have unique identifiers (duplicate: {0})")]
    DuplicateNode(String),

    #[error("{}", describe_dangling(.missing_sources, .missing_targets))]
    DanglingEdges {
        missing_sources: Vec<String>,
        missing_targets: Vec<String>,
    },

    #[error("Edge {from_id} -> {to_id} has confidence {confidence} outside [0, 1]")]
    ConfidenceOutOfRange {
        from_id: String,
        to_id: String,
        confidence: f64,
    },

    #[error("Graph edge is missing evidence: {from_id} -> {to_id} ({edge_type})")]
    MissingEvidence {
        from_id: String,
        to_id: String,
        edge_type: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    SchemaError(String),
}

fn describe_dangling(missing_sources: &[String], missing_targets: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing_sources.is_empty() {
        parts.push(format!(
            "Edges reference unknown source nodes: {}",
            missing_sources.join(", ")
        ));
    }
    if !missing_targets.is_empty() {
        parts.push(format!(
            "Edges reference unknown target nodes: {}",
            missing_targets.join(", ")
        ));
    }
    parts.join("; ")
}
