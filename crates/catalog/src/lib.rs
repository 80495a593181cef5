//! Database introspection collaborators.
//!
//! Verification asks two questions of a database: does this table exist, and which
//! columns does it have. Negative answers carry a fixed confidence penalty.

mod adapter;
mod error;
mod fixture;
mod sqlite;
mod types;

pub use adapter::{ensure_safe_identifier, DatabaseAdapter};
pub use error::{CatalogError, Result};
pub use fixture::{FixtureCatalog, FixtureTable};
pub use sqlite::SqliteCatalog;
pub use types::{
    ColumnIntrospection, ColumnMetadata, TableIntrospection, NEGATIVE_RESULT_CONFIDENCE_DELTA,
};
