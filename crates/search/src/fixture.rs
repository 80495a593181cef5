use crate::adapter::SearchAdapter;
use crate::error::Result;
use crate::query::{RepoHit, SearchQuery};
use crudmap_protocol::PathFilter;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// In-memory adapter mapping exact patterns to canned hits.
///
/// Honors `SearchQuery::paths` and remembers every pattern it was asked for.
#[derive(Debug, Default)]
pub struct FixtureSearch {
    hits: BTreeMap<String, Vec<RepoHit>>,
    history: Mutex<Vec<String>>,
}

impl FixtureSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, pattern: impl Into<String>, hits: Vec<RepoHit>) -> Self {
        self.hits.entry(pattern.into()).or_default().extend(hits);
        self
    }

    /// Parse `{"pattern": [hit, ...], ...}`
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let hits: BTreeMap<String, Vec<RepoHit>> = serde_json::from_str(raw)?;
        Ok(Self {
            hits,
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Patterns queried so far, in order
    pub fn queried_patterns(&self) -> Vec<String> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SearchAdapter for FixtureSearch {
    fn search(&self, query: &SearchQuery) -> Result<Vec<RepoHit>> {
        match self.history.lock() {
            Ok(mut history) => history.push(query.pattern.clone()),
            Err(poisoned) => poisoned.into_inner().push(query.pattern.clone()),
        }

        let filter = PathFilter::new(query.paths.as_slice());
        let hits: Vec<RepoHit> = self
            .hits
            .get(&query.pattern)
            .map(|hits| {
                hits.iter()
                    .filter(|hit| filter.allows(&hit.path))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn returns_hits_for_exact_pattern_only() {
        let search = FixtureSearch::new().with_hits(
            "billing_ledger",
            vec![RepoHit::new("svc/billing.py", 3, "INSERT INTO billing_ledger")],
        );
        assert_eq!(search.search(&SearchQuery::new("billing_ledger")).unwrap().len(), 1);
        assert!(search.search(&SearchQuery::new("billing")).unwrap().is_empty());
        assert_eq!(search.queried_patterns(), vec!["billing_ledger", "billing"]);
    }

    #[test]
    fn path_filter_restricts_hits() {
        let search = FixtureSearch::new().with_hits(
            "orders",
            vec![
                RepoHit::new("services/orders/api.py", 1, "orders"),
                RepoHit::new("tools/migrate.py", 9, "orders"),
            ],
        );
        let query = SearchQuery::new("orders").with_paths(["services"]);
        let hits = search.search(&query).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "services/orders/api.py");
    }

    #[test]
    fn loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.json");
        std::fs::write(
            &path,
            r#"{"session_store": [{"path": "jobs/sweep.py", "line_number": 7, "line": "DELETE FROM session_store"}]}"#,
        )
        .unwrap();
        let search = FixtureSearch::from_json_file(&path).unwrap();
        let hits = search.search(&SearchQuery::new("session_store")).unwrap();
        assert_eq!(hits[0].locator(), "jobs/sweep.py:L7");
    }

    #[test]
    fn malformed_fixture_is_rejected() {
        assert!(FixtureSearch::from_json_str(r#"{"x": [{"path": 1}]}"#).is_err());
    }
}
