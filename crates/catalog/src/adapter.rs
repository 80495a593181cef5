use crate::error::{CatalogError, Result};
use crate::types::{ColumnIntrospection, TableIntrospection};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile")
});

/// Database introspection collaborator.
pub trait DatabaseAdapter {
    fn introspect_table(&self, table: &str, schema: Option<&str>) -> Result<TableIntrospection>;

    fn introspect_columns(&self, table: &str, schema: Option<&str>) -> Result<ColumnIntrospection>;
}

impl<T: DatabaseAdapter + ?Sized> DatabaseAdapter for &T {
    fn introspect_table(&self, table: &str, schema: Option<&str>) -> Result<TableIntrospection> {
        (**self).introspect_table(table, schema)
    }

    fn introspect_columns(&self, table: &str, schema: Option<&str>) -> Result<ColumnIntrospection> {
        (**self).introspect_columns(table, schema)
    }
}

impl<T: DatabaseAdapter + ?Sized> DatabaseAdapter for Box<T> {
    fn introspect_table(&self, table: &str, schema: Option<&str>) -> Result<TableIntrospection> {
        (**self).introspect_table(table, schema)
    }

    fn introspect_columns(&self, table: &str, schema: Option<&str>) -> Result<ColumnIntrospection> {
        (**self).introspect_columns(table, schema)
    }
}

/// Reject anything that is not a plain SQL identifier before it reaches a query.
pub fn ensure_safe_identifier(identifier: &str) -> Result<&str> {
    if IDENTIFIER.is_match(identifier) {
        Ok(identifier)
    } else {
        Err(CatalogError::UnsafeIdentifier(identifier.to_string()))
    }
}
