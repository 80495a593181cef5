use crate::config::PipelineConfig;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::verify::{Verifier, VerifyStage};
use crudmap_catalog::DatabaseAdapter;
use crudmap_graph::{write_json, write_ndjson, Edge, Graph, Node};
use crudmap_normalize::{NormalizationRequest, NormalizeStage, Normalizer, TermGlossary};
use crudmap_search::{SearchAdapter, SearchQuery};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Ndjson,
}

/// Where and how a finished graph is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub format: OutputFormat,
    pub path: PathBuf,
}

impl PipelineOutput {
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self {
            format: OutputFormat::Json,
            path: path.into(),
        }
    }

    pub fn ndjson(path: impl Into<PathBuf>) -> Self {
        Self {
            format: OutputFormat::Ndjson,
            path: path.into(),
        }
    }

    pub fn write(&self, graph: &Graph) -> Result<()> {
        write_graph(graph, self.format, &self.path)
    }
}

fn write_graph(graph: &Graph, format: OutputFormat, path: &Path) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(graph, path)?,
        OutputFormat::Ndjson => write_ndjson(graph, path)?,
    }
    log::info!(
        "Wrote {} nodes / {} edges to {}",
        graph.node_count(),
        graph.edge_count(),
        path.display()
    );
    Ok(())
}

/// Per-run inputs besides the requests themselves
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub default_service: Option<String>,
    pub glossary_overrides: Option<TermGlossary>,
    pub repo_base_query: Option<SearchQuery>,
    pub schema: Option<String>,
}

impl RunOptions {
    /// Glossary overrides and default schema taken from the config file
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            glossary_overrides: config.glossary_overrides(),
            schema: config.verify.default_schema.clone(),
            ..Self::default()
        }
    }

    pub fn with_default_service(mut self, service: impl Into<String>) -> Self {
        self.default_service = Some(service.into());
        self
    }

    pub fn with_repo_base_query(mut self, query: SearchQuery) -> Self {
        self.repo_base_query = Some(query);
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Orchestrated run followed by validation, canonical ordering and persistence.
pub struct CrudPipeline<N, V> {
    orchestrator: Orchestrator<N, V>,
}

impl<S: SearchAdapter, D: DatabaseAdapter> CrudPipeline<Normalizer, Verifier<S, D>> {
    /// Keyword normalizer plus evidence verifier, both tuned by `config`.
    pub fn heuristic(search: S, database: D, config: &PipelineConfig) -> Self {
        let verifier = Verifier::from_config(search, database, &config.verify);
        Self::new(Orchestrator::with_config(
            Normalizer::default(),
            verifier,
            config.orchestrator.clone(),
        ))
    }
}

impl<N: NormalizeStage, V: VerifyStage> CrudPipeline<N, V> {
    pub fn new(orchestrator: Orchestrator<N, V>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator<N, V> {
        &self.orchestrator
    }

    /// Returns the prepared graph. Nothing is written when it has no edges.
    pub fn run(
        &self,
        requests: &[NormalizationRequest],
        options: &RunOptions,
        outputs: &[PipelineOutput],
    ) -> Result<Graph> {
        let graph = self.orchestrator.run(
            requests,
            options.default_service.as_deref(),
            options.glossary_overrides.as_ref(),
            options.repo_base_query.as_ref(),
            options.schema.as_deref(),
        )?;
        if graph.edges().is_empty() {
            log::info!("No verified edges, skipping {} outputs", outputs.len());
            return Ok(graph);
        }

        validate_graph(&graph)?;
        let prepared = prepare_graph(graph)?;
        for output in outputs {
            output.write(&prepared)?;
        }
        Ok(prepared)
    }
}

/// Reject graphs that are not fit to persist.
///
/// Structure is re-checked and every edge must carry evidence; the first offending
/// edge is reported.
pub fn validate_graph(graph: &Graph) -> Result<()> {
    Graph::with_schema_version(
        graph.nodes().to_vec(),
        graph.edges().to_vec(),
        graph.schema_version(),
    )?;
    graph.ensure_evidence()?;
    Ok(())
}

/// Deterministic copy for diffing: nodes by id, edges by endpoints, type and
/// confidence, evidence by kind and locator.
pub fn prepare_graph(graph: Graph) -> Result<Graph> {
    let (mut nodes, mut edges, schema_version) = graph.into_parts();
    nodes.sort_by(|a: &Node, b: &Node| a.id.cmp(&b.id));
    for edge in &mut edges {
        edge.evidence
            .sort_by(|a, b| (a.kind.as_str(), &a.locator).cmp(&(b.kind.as_str(), &b.locator)));
    }
    edges.sort_by(|a: &Edge, b: &Edge| {
        (&a.from_id, &a.to_id, a.edge_type.as_str())
            .cmp(&(&b.from_id, &b.to_id, b.edge_type.as_str()))
            .then_with(|| a.confidence.total_cmp(&b.confidence))
    });
    Ok(Graph::with_schema_version(nodes, edges, schema_version)?)
}
