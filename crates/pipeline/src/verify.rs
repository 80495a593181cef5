use crate::config::{VerifyConfig, DEFAULT_DB_SOURCE_TOOL, DEFAULT_REPO_SOURCE_TOOL};
use crate::error::Result;
use crudmap_catalog::{DatabaseAdapter, NEGATIVE_RESULT_CONFIDENCE_DELTA};
use crudmap_graph::{
    calculate_confidence, Edge, EdgeType, Evidence, EvidenceKind, Graph, Node, NodeType,
};
use crudmap_normalize::{CrudAction, CrudActionList};
use crudmap_search::{RepoHit, RepositorySearcher, SearchAdapter, SearchQuery};
use serde_json::Value;
use std::collections::HashSet;

/// Anything that turns CRUD actions into an evidence-backed graph.
pub trait VerifyStage {
    fn verify(
        &self,
        actions: &CrudActionList,
        repo_base_query: Option<&SearchQuery>,
        schema: Option<&str>,
    ) -> Result<Graph>;
}

impl<T: VerifyStage + ?Sized> VerifyStage for &T {
    fn verify(
        &self,
        actions: &CrudActionList,
        repo_base_query: Option<&SearchQuery>,
        schema: Option<&str>,
    ) -> Result<Graph> {
        (**self).verify(actions, repo_base_query, schema)
    }
}

impl<T: VerifyStage + ?Sized> VerifyStage for Box<T> {
    fn verify(
        &self,
        actions: &CrudActionList,
        repo_base_query: Option<&SearchQuery>,
        schema: Option<&str>,
    ) -> Result<Graph> {
        (**self).verify(actions, repo_base_query, schema)
    }
}

/// One action that survived both evidence sources
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAction {
    pub service: Node,
    pub table: Node,
    pub edge: Edge,
}

/// Cross-checks actions against repository search and database introspection.
///
/// An action becomes an edge only if the repository mentions it and the table exists.
/// Either miss drops the whole action; nothing partial reaches the graph.
pub struct Verifier<S, D> {
    searcher: RepositorySearcher<S>,
    database: D,
    repo_source_tool: String,
    db_source_tool: String,
    default_schema: Option<String>,
}

impl<S: SearchAdapter, D: DatabaseAdapter> Verifier<S, D> {
    pub fn new(search: S, database: D) -> Self {
        Self {
            searcher: RepositorySearcher::new(search),
            database,
            repo_source_tool: DEFAULT_REPO_SOURCE_TOOL.to_string(),
            db_source_tool: DEFAULT_DB_SOURCE_TOOL.to_string(),
            default_schema: None,
        }
    }

    pub fn from_config(search: S, database: D, config: &VerifyConfig) -> Self {
        Self::new(search, database)
            .with_tools(config.repo_source_tool.clone(), config.db_source_tool.clone())
            .with_default_schema(config.default_schema.clone())
    }

    pub fn with_tools(
        mut self,
        repo_source_tool: impl Into<String>,
        db_source_tool: impl Into<String>,
    ) -> Self {
        self.repo_source_tool = repo_source_tool.into();
        self.db_source_tool = db_source_tool.into();
        self
    }

    /// Schema used when `verify` is called without one
    pub fn with_default_schema(mut self, schema: Option<String>) -> Self {
        self.default_schema = schema;
        self
    }

    pub fn verify(
        &self,
        actions: &CrudActionList,
        repo_base_query: Option<&SearchQuery>,
        schema: Option<&str>,
    ) -> Result<Graph> {
        let default_query = SearchQuery::default();
        let base_query = repo_base_query.unwrap_or(&default_query);
        let schema = schema.or(self.default_schema.as_deref());

        let mut nodes = Vec::new();
        let mut seen = HashSet::new();
        let mut edges = Vec::new();

        for action in &actions.actions {
            let Some(verified) = self.verify_action(action, base_query, schema)? else {
                continue;
            };
            for node in [verified.service, verified.table] {
                if seen.insert(node.id.clone()) {
                    nodes.push(node);
                }
            }
            edges.push(verified.edge);
        }

        log::debug!(
            "Verified {} of {} actions ({} nodes)",
            edges.len(),
            actions.len(),
            nodes.len()
        );
        Ok(Graph::new(nodes, edges)?)
    }

    /// Evidence, confidence and graph fragments for a single action, `None` when dropped.
    pub fn verify_action(
        &self,
        action: &CrudAction,
        base_query: &SearchQuery,
        schema: Option<&str>,
    ) -> Result<Option<VerifiedAction>> {
        let candidates = candidate_patterns(action);
        let hits = self.searcher.search_candidates(&candidates, base_query)?;
        if hits.is_empty() {
            log::debug!(
                "Dropping {} {} -> {}: no repository hits",
                action.verb,
                action.service,
                action.table
            );
            return Ok(None);
        }
        let mut evidence: Vec<Evidence> = hits.iter().map(|hit| self.code_evidence(hit)).collect();

        let table_result = self.database.introspect_table(&action.table, schema)?;
        if !table_result.exists {
            log::debug!(
                "Dropping {} {} -> {}: table not found",
                action.verb,
                action.service,
                action.table
            );
            return Ok(None);
        }
        let mut table_evidence = Evidence::new(EvidenceKind::Config, table_result.locator())
            .with_tool(&self.db_source_tool);
        if let Some(row_count) = table_result.row_count {
            table_evidence = table_evidence.with_snippet(format!("row_count={row_count}"));
        }
        evidence.push(table_evidence);

        let mut adjustment = table_result.confidence_delta;
        if !action.columns.is_empty() {
            let column_result = self.database.introspect_columns(&action.table, schema)?;
            adjustment += column_result.confidence_delta;
            let missing = column_result.missing(&action.columns);
            if column_result.exists && missing.is_empty() {
                evidence.push(
                    Evidence::new(EvidenceKind::Config, column_result.locator())
                        .with_snippet(format!("columns={}", column_result.sorted_names()))
                        .with_tool(&self.db_source_tool),
                );
            } else if !missing.is_empty() {
                log::debug!(
                    "Columns missing from {}: {}",
                    action.table,
                    missing.join(", ")
                );
                adjustment += NEGATIVE_RESULT_CONFIDENCE_DELTA;
            }
        }

        let scored = calculate_confidence(&evidence, false);
        let evidence_delta: f64 = scored.contributions.iter().map(|c| c.delta).sum();
        let confidence = clamp_unit(action.confidence + evidence_delta);
        let confidence = clamp_unit(confidence + adjustment);

        let service = Node::new(
            Node::service_id(&action.service),
            NodeType::Service,
            action.service.clone(),
        );
        let table = Node::new(
            Node::table_id(&table_result.table, table_result.schema.as_deref()),
            NodeType::DbTable,
            action.table.clone(),
        )
        .with_attr(
            "schema",
            table_result
                .schema
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        let edge_type = if action.verb.is_write() {
            EdgeType::Writes
        } else {
            EdgeType::Reads
        };
        let edge = Edge::new(service.id.clone(), table.id.clone(), edge_type, confidence)
            .with_evidence(evidence);

        Ok(Some(VerifiedAction {
            service,
            table,
            edge,
        }))
    }

    fn code_evidence(&self, hit: &RepoHit) -> Evidence {
        Evidence::new(EvidenceKind::Code, hit.locator())
            .with_snippet(hit.line.clone())
            .with_tool(&self.repo_source_tool)
    }
}

impl<S: SearchAdapter, D: DatabaseAdapter> VerifyStage for Verifier<S, D> {
    fn verify(
        &self,
        actions: &CrudActionList,
        repo_base_query: Option<&SearchQuery>,
        schema: Option<&str>,
    ) -> Result<Graph> {
        Verifier::verify(self, actions, repo_base_query, schema)
    }
}

/// Search patterns for an action, most specific identifier first.
///
/// `table`, then `table.column` per column, `table.key` per where-key, then the service.
/// Empty and repeated patterns are skipped.
pub fn candidate_patterns(action: &CrudAction) -> Vec<String> {
    let mut raw = Vec::with_capacity(2 + action.columns.len() + action.where_keys.len());
    raw.push(action.table.clone());
    raw.extend(
        action
            .columns
            .iter()
            .map(|column| format!("{}.{column}", action.table)),
    );
    raw.extend(
        action
            .where_keys
            .iter()
            .map(|key| format!("{}.{key}", action.table)),
    );
    raw.push(action.service.clone());

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|pattern| !pattern.is_empty() && seen.insert(pattern.clone()))
        .collect()
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
