use serde::{Deserialize, Serialize};

/// Penalty applied when an introspection check comes back negative.
pub const NEGATIVE_RESULT_CONFIDENCE_DELTA: f64 = -0.3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
        }
    }
}

/// Outcome of a table existence check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableIntrospection {
    pub table: String,
    pub schema: Option<String>,
    pub exists: bool,
    pub row_count: Option<u64>,
    pub confidence_delta: f64,
}

impl TableIntrospection {
    pub fn found(table: impl Into<String>, schema: Option<String>, row_count: Option<u64>) -> Self {
        Self {
            table: table.into(),
            schema,
            exists: true,
            row_count,
            confidence_delta: 0.0,
        }
    }

    pub fn missing(table: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            table: table.into(),
            schema,
            exists: false,
            row_count: None,
            confidence_delta: NEGATIVE_RESULT_CONFIDENCE_DELTA,
        }
    }

    /// `db:schema.table`, or `db:table` without a schema
    pub fn locator(&self) -> String {
        match &self.schema {
            Some(schema) => format!("db:{}.{}", schema, self.table),
            None => format!("db:{}", self.table),
        }
    }
}

/// Outcome of a column listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnIntrospection {
    pub table: String,
    pub schema: Option<String>,
    pub exists: bool,
    pub columns: Vec<ColumnMetadata>,
    pub confidence_delta: f64,
}

impl ColumnIntrospection {
    /// `exists` follows whether any column was found.
    pub fn from_columns(
        table: impl Into<String>,
        schema: Option<String>,
        columns: Vec<ColumnMetadata>,
    ) -> Self {
        let exists = !columns.is_empty();
        Self {
            table: table.into(),
            schema,
            exists,
            columns,
            confidence_delta: if exists {
                0.0
            } else {
                NEGATIVE_RESULT_CONFIDENCE_DELTA
            },
        }
    }

    /// Same shape as [`TableIntrospection::locator`], for the table that was listed
    pub fn locator(&self) -> String {
        match &self.schema {
            Some(schema) => format!("db:{}.{}", schema, self.table),
            None => format!("db:{}", self.table),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    /// Requested names absent from the listing, in request order
    pub fn missing<'a, S: AsRef<str>>(&self, requested: &'a [S]) -> Vec<&'a str> {
        requested
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.has_column(name))
            .collect()
    }

    /// Column names sorted and comma-joined
    pub fn sorted_names(&self) -> String {
        let mut names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names.join(",")
    }
}
