//! # crudmap pipeline
//!
//! Normalize -> verify -> filter, with bounded retries, plus the pieces around it:
//! configuration, validated output, and runtime evidence helpers.
//!
//! ```text
//! NormalizationRequest[]
//!     │  NormalizeStage (retried up to max_normalize_attempts)
//!     ▼
//! CrudActionList
//!     │  VerifyStage: repository search + database introspection
//!     ▼  (retried up to max_verify_attempts)
//! Graph (scored edges)
//!     │  filter: evidence required, confidence >= threshold
//!     ▼
//! Graph ── CrudPipeline: validate, canonical order, JSON / NDJSON
//! ```
//!
//! Stage faults inside the attempt budget never escape [`Orchestrator::run`]; they are
//! logged and degrade to an empty graph.

mod config;
mod error;
mod orchestrator;
mod output;
mod runtime;
mod verify;

pub use config::{
    GlossaryConfig, OrchestratorConfig, PipelineConfig, VerifyConfig,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DB_SOURCE_TOOL, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_REPO_SOURCE_TOOL,
};
pub use error::{PipelineError, Result};
pub use orchestrator::Orchestrator;
pub use output::{
    prepare_graph, validate_graph, CrudPipeline, OutputFormat, PipelineOutput, RunOptions,
};
pub use runtime::{flags_from_otel_spans, flags_from_pg_stat_statements, RuntimeEdgeFlags};
pub use verify::{candidate_patterns, VerifiedAction, Verifier, VerifyStage};
