use crudmap_catalog::CatalogError;
use crudmap_graph::GraphError;
use crudmap_normalize::NormalizeError;
use crudmap_protocol::{ErrorCategory, ErrorEnvelope};
use crudmap_search::SearchError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Orchestration(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Repository search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Database introspection failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid runtime payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Orchestration(_) => ErrorCategory::Orchestration,
            PipelineError::Search(_)
            | PipelineError::Catalog(_)
            | PipelineError::IoError(_)
            | PipelineError::Normalize(NormalizeError::Client(_)) => ErrorCategory::Collaborator,
            PipelineError::Graph(GraphError::IoError(_)) => ErrorCategory::Collaborator,
            PipelineError::Graph(_)
            | PipelineError::Normalize(_)
            | PipelineError::Config(_)
            | PipelineError::ConfigParse(_)
            | PipelineError::InvalidPayload(_) => ErrorCategory::Validation,
        }
    }

    /// User-facing shape of this fault.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.category(), self.to_string());
        match self {
            PipelineError::Graph(GraphError::DuplicateNode(id)) => {
                envelope.with_details(json!({ "duplicate_node": id }))
            }
            PipelineError::Graph(GraphError::DanglingEdges {
                missing_sources,
                missing_targets,
            }) => envelope
                .with_details(json!({
                    "missing_sources": missing_sources,
                    "missing_targets": missing_targets,
                }))
                .with_hint("Every edge endpoint must be declared as a node"),
            PipelineError::Graph(GraphError::MissingEvidence {
                from_id,
                to_id,
                edge_type,
            }) => envelope
                .with_details(json!({ "from": from_id, "to": to_id, "type": edge_type }))
                .with_hint("Edges written to disk need at least one piece of evidence"),
            PipelineError::Orchestration(_) => {
                envelope.with_hint("Check max_normalize_attempts and max_verify_attempts")
            }
            PipelineError::Config(_) | PipelineError::ConfigParse(_) => {
                envelope.with_hint("See the [orchestrator], [verify] and [glossary] sections")
            }
            _ => envelope,
        }
    }
}
