use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod path_filters;

pub use path_filters::PathFilter;

/// Version of the error envelope wire format.
pub const ERROR_ENVELOPE_VERSION: u32 = 1;

/// Coarse fault taxonomy shared by every crate in the workspace.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input, schema or invariant violations.
    Validation,
    /// A pipeline stage exhausted its attempts without a diagnosable cause.
    Orchestration,
    /// Repository search, database introspection or LLM failures.
    Collaborator,
}

impl ErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Orchestration => "orchestration",
            ErrorCategory::Collaborator => "collaborator",
        }
    }
}

/// Single structured object a caller sees when something goes wrong.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: ErrorCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serialize_json(self)
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn envelope_serializes_category_as_snake_case() {
        let envelope = ErrorEnvelope::new(ErrorCategory::Orchestration, "stage exhausted")
            .with_details(json!({ "stage": "normalize" }));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["code"], "orchestration");
        assert_eq!(value["details"]["stage"], "normalize");
        assert!(value.get("hint").is_none());
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = ErrorEnvelope::new(ErrorCategory::Validation, "bad graph")
            .with_hint("check edge endpoints");
        let raw = envelope.to_json().unwrap();
        let parsed: ErrorEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, envelope);
    }
}
