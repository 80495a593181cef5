use crate::adapter::DatabaseAdapter;
use crate::error::Result;
use crate::types::{ColumnIntrospection, ColumnMetadata, TableIntrospection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Canned description of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureTable {
    #[serde(default = "default_exists")]
    pub exists: bool,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

fn default_exists() -> bool {
    true
}

impl FixtureTable {
    pub fn new() -> Self {
        Self {
            exists: true,
            row_count: None,
            columns: Vec::new(),
        }
    }

    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_columns<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.columns = names
            .into_iter()
            .map(|name| ColumnMetadata::new(name, "text"))
            .collect();
        self
    }
}

impl Default for FixtureTable {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory catalog keyed by `table` or `schema.table`.
///
/// Schema-qualified entries win over bare ones. Unknown tables report a negative result,
/// including names no SQL catalog would accept; nothing here is interpolated into a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureCatalog {
    tables: BTreeMap<String, FixtureTable>,
}

impl FixtureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, key: impl Into<String>, table: FixtureTable) -> Self {
        self.tables.insert(key.into(), table);
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn lookup(&self, table: &str, schema: Option<&str>) -> Option<&FixtureTable> {
        schema
            .and_then(|schema| self.tables.get(&format!("{schema}.{table}")))
            .or_else(|| self.tables.get(table))
    }
}

impl DatabaseAdapter for FixtureCatalog {
    fn introspect_table(&self, table: &str, schema: Option<&str>) -> Result<TableIntrospection> {
        let owned_schema = schema.map(str::to_string);

        Ok(match self.lookup(table, schema) {
            Some(entry) if entry.exists => {
                TableIntrospection::found(table, owned_schema, entry.row_count)
            }
            _ => TableIntrospection::missing(table, owned_schema),
        })
    }

    fn introspect_columns(&self, table: &str, schema: Option<&str>) -> Result<ColumnIntrospection> {
        let columns = match self.lookup(table, schema) {
            Some(entry) if entry.exists => entry.columns.clone(),
            _ => Vec::new(),
        };
        Ok(ColumnIntrospection::from_columns(
            table,
            schema.map(str::to_string),
            columns,
        ))
    }
}
