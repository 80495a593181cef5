use crate::config::OrchestratorConfig;
use crate::error::{PipelineError, Result};
use crate::verify::VerifyStage;
use crudmap_graph::{Edge, Graph};
use crudmap_normalize::{CrudActionList, NormalizationRequest, NormalizeStage, TermGlossary};
use crudmap_search::SearchQuery;
use std::collections::HashSet;
use std::fmt::Display;

/// Drives normalize -> verify -> filter with bounded retries per stage.
///
/// A stage fault inside the attempt budget is logged and retried. Running out of
/// attempts after at least one fault degrades to an empty result; running out without
/// a single attempt is an [`PipelineError::Orchestration`] fault.
pub struct Orchestrator<N, V> {
    normalizer: N,
    verifier: V,
    config: OrchestratorConfig,
}

impl<N: NormalizeStage, V: VerifyStage> Orchestrator<N, V> {
    pub fn new(normalizer: N, verifier: V) -> Self {
        Self::with_config(normalizer, verifier, OrchestratorConfig::default())
    }

    pub fn with_config(normalizer: N, verifier: V, config: OrchestratorConfig) -> Self {
        Self {
            normalizer,
            verifier,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn run(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
        repo_base_query: Option<&SearchQuery>,
        schema: Option<&str>,
    ) -> Result<Graph> {
        let actions = self.normalize(requests, default_service, glossary_overrides)?;
        if actions.is_empty() {
            log::info!("Normalization produced no actions");
            return Ok(Graph::empty());
        }

        let graph = self.verify(&actions, repo_base_query, schema)?;
        if graph.edges().is_empty() {
            return Ok(graph);
        }
        self.filter(&graph)
    }

    fn normalize(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> Result<CrudActionList> {
        let outcome = retry("Normalization", self.config.max_normalize_attempts, || {
            self.normalizer
                .normalize(requests, default_service, glossary_overrides)
        })?;
        Ok(outcome.unwrap_or_default())
    }

    fn verify(
        &self,
        actions: &CrudActionList,
        repo_base_query: Option<&SearchQuery>,
        schema: Option<&str>,
    ) -> Result<Graph> {
        let outcome = retry("Verification", self.config.max_verify_attempts, || {
            self.verifier.verify(actions, repo_base_query, schema)
        })?;
        Ok(outcome.unwrap_or_default())
    }

    /// Keep edges that carry evidence (when required) and clear the threshold, plus
    /// exactly the nodes they reference.
    pub fn filter(&self, graph: &Graph) -> Result<Graph> {
        let threshold = self.config.confidence_threshold;
        let edges: Vec<Edge> = graph
            .edges()
            .iter()
            .filter(|edge| !(self.config.require_evidence && edge.evidence.is_empty()))
            .filter(|edge| edge.confidence >= threshold)
            .cloned()
            .collect();
        if edges.is_empty() {
            log::info!(
                "No edges cleared the {threshold} confidence threshold ({} candidates)",
                graph.edge_count()
            );
            return Ok(Graph::empty());
        }

        let referenced: HashSet<&str> = edges
            .iter()
            .flat_map(|edge| [edge.from_id.as_str(), edge.to_id.as_str()])
            .collect();
        let nodes = graph
            .nodes()
            .iter()
            .filter(|node| referenced.contains(node.id.as_str()))
            .cloned()
            .collect();

        log::debug!(
            "Kept {} of {} edges at threshold {threshold}",
            edges.len(),
            graph.edge_count()
        );
        Ok(Graph::with_schema_version(
            nodes,
            edges,
            graph.schema_version(),
        )?)
    }
}

/// Up to `max_attempts` immediate attempts.
///
/// `Ok(Some(_))` on the first success, `Ok(None)` when every attempt faulted.
fn retry<T, E, F>(stage: &str, max_attempts: usize, mut attempt: F) -> Result<Option<T>>
where
    E: Display,
    F: FnMut() -> std::result::Result<T, E>,
{
    let mut errors: Vec<String> = Vec::new();
    for number in 1..=max_attempts {
        match attempt() {
            Ok(value) => {
                if number > 1 {
                    log::info!("{stage} succeeded on attempt {number}");
                }
                return Ok(Some(value));
            }
            Err(err) => {
                log::warn!("{stage} attempt {number}/{max_attempts} failed: {err}");
                errors.push(err.to_string());
            }
        }
    }

    if errors.is_empty() {
        return Err(PipelineError::Orchestration(format!(
            "{stage} failed without raising an exception"
        )));
    }
    log::warn!(
        "{stage} exhausted {} attempts, continuing with an empty result",
        errors.len()
    );
    Ok(None)
}
