use crate::error::{NormalizeError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SQL verb an action performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrudVerb {
    Insert,
    Update,
    Delete,
    Select,
}

impl CrudVerb {
    pub const fn as_str(self) -> &'static str {
        match self {
            CrudVerb::Insert => "INSERT",
            CrudVerb::Update => "UPDATE",
            CrudVerb::Delete => "DELETE",
            CrudVerb::Select => "SELECT",
        }
    }

    pub const fn is_write(self) -> bool {
        !matches!(self, CrudVerb::Select)
    }
}

impl std::fmt::Display for CrudVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CodeLocation {
    pub path: String,
    pub span: String,
}

/// Structured CRUD candidate produced by normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrudAction {
    pub service: String,
    pub table: String,
    #[serde(rename = "action")]
    pub verb: CrudVerb,
    pub columns: Vec<String>,
    pub where_keys: Vec<String>,
    #[serde(default)]
    pub code_locations: Vec<CodeLocation>,
    /// Normalization confidence in [0, 1]
    pub confidence: f64,
}

impl CrudAction {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(self.invalid(format!(
                "confidence {} is outside [0, 1]",
                self.confidence
            )));
        }
        if self.service.trim().is_empty() {
            return Err(self.invalid("service is empty".to_string()));
        }
        if self.table.trim().is_empty() {
            return Err(self.invalid("table is empty".to_string()));
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> NormalizeError {
        NormalizeError::InvalidAction {
            service: self.service.clone(),
            table: self.table.clone(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrudActionList {
    #[serde(default)]
    pub actions: Vec<CrudAction>,
}

impl CrudActionList {
    pub fn new(actions: Vec<CrudAction>) -> Self {
        Self { actions }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn validate(&self) -> Result<()> {
        self.actions.iter().try_for_each(CrudAction::validate)
    }
}
