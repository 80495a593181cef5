use crate::action::CodeLocation;
use serde::{Deserialize, Serialize};

/// One ambiguous CRUD description plus whatever hints the caller already has
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationRequest {
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_hint: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns_hint: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub where_hint: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
}

impl NormalizationRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_table_hint(mut self, table: impl Into<String>) -> Self {
        self.table_hint = Some(table.into());
        self
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns_hint = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_where_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.where_hint = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location(mut self, path: impl Into<String>, span: Option<String>) -> Self {
        self.path = Some(path.into());
        self.span = span;
        self
    }

    /// Source location carried by the request; span defaults to an empty string.
    pub fn code_locations(&self) -> Vec<CodeLocation> {
        match self.path.as_deref().filter(|path| !path.is_empty()) {
            Some(path) => vec![CodeLocation {
                path: path.to_string(),
                span: self.span.clone().unwrap_or_default(),
            }],
            None => Vec::new(),
        }
    }
}
