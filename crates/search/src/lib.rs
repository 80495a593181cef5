//! Repository search collaborators.
//!
//! Verification only needs "where does this identifier appear?". Adapters answer that
//! from canned fixtures, closures or a ripgrep process; [`RepositorySearcher`] walks a
//! list of candidate spellings and stops at the first one that hits.

mod adapter;
mod error;
mod fixture;
mod query;
mod ripgrep;

pub use adapter::{FnSearch, RepositorySearcher, SearchAdapter};
pub use error::{Result, SearchError};
pub use fixture::FixtureSearch;
pub use query::{RepoHit, SearchQuery};
pub use ripgrep::{parse_ripgrep_json, RipgrepSearch};
