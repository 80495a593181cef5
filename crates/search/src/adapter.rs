use crate::error::Result;
use crate::query::{RepoHit, SearchQuery};

/// Anything able to answer a repository search.
pub trait SearchAdapter {
    fn search(&self, query: &SearchQuery) -> Result<Vec<RepoHit>>;
}

impl<T: SearchAdapter + ?Sized> SearchAdapter for &T {
    fn search(&self, query: &SearchQuery) -> Result<Vec<RepoHit>> {
        (**self).search(query)
    }
}

impl<T: SearchAdapter + ?Sized> SearchAdapter for Box<T> {
    fn search(&self, query: &SearchQuery) -> Result<Vec<RepoHit>> {
        (**self).search(query)
    }
}

/// Adapter backed by a closure
pub struct FnSearch<F> {
    func: F,
}

impl<F> FnSearch<F>
where
    F: Fn(&SearchQuery) -> Result<Vec<RepoHit>>,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> SearchAdapter for FnSearch<F>
where
    F: Fn(&SearchQuery) -> Result<Vec<RepoHit>>,
{
    fn search(&self, query: &SearchQuery) -> Result<Vec<RepoHit>> {
        (self.func)(query)
    }
}

/// Tries ambiguous candidate patterns one after another.
pub struct RepositorySearcher<A> {
    adapter: A,
}

impl<A: SearchAdapter> RepositorySearcher<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn search(&self, query: &SearchQuery) -> Result<Vec<RepoHit>> {
        self.adapter.search(query)
    }

    /// Hits for the first candidate that yields any; later candidates are never queried.
    pub fn search_candidates<S: AsRef<str>>(
        &self,
        candidates: &[S],
        base_query: &SearchQuery,
    ) -> Result<Vec<RepoHit>> {
        for candidate in candidates {
            let query = base_query.with_pattern(candidate.as_ref());
            let hits = self.adapter.search(&query)?;
            if !hits.is_empty() {
                log::debug!(
                    "Candidate '{}' matched {} hits",
                    candidate.as_ref(),
                    hits.len()
                );
                return Ok(hits);
            }
        }
        Ok(Vec::new())
    }
}
