use crate::error::{PipelineError, Result};
use crudmap_normalize::TermGlossary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MAX_ATTEMPTS: usize = 2;
pub const DEFAULT_REPO_SOURCE_TOOL: &str = "repo-search";
pub const DEFAULT_DB_SOURCE_TOOL: &str = "db-introspect";

/// Whole pipeline configuration, usually read from `crudmap.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub orchestrator: OrchestratorConfig,
    pub verify: VerifyConfig,
    pub glossary: GlossaryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Edges below this confidence are filtered out
    pub confidence_threshold: f64,

    /// Drop edges without evidence
    pub require_evidence: bool,

    pub max_normalize_attempts: usize,
    pub max_verify_attempts: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            require_evidence: true,
            max_normalize_attempts: DEFAULT_MAX_ATTEMPTS,
            max_verify_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Tool tag stamped on code evidence
    pub repo_source_tool: String,

    /// Tool tag stamped on config evidence
    pub db_source_tool: String,

    pub default_schema: Option<String>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            repo_source_tool: DEFAULT_REPO_SOURCE_TOOL.to_string(),
            db_source_tool: DEFAULT_DB_SOURCE_TOOL.to_string(),
            default_schema: None,
        }
    }
}

/// Alias overrides layered over the builtin glossary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryConfig {
    pub service_aliases: BTreeMap<String, String>,
    pub table_aliases: BTreeMap<String, String>,
    pub column_aliases: BTreeMap<String, String>,
}

impl GlossaryConfig {
    pub fn is_empty(&self) -> bool {
        self.service_aliases.is_empty()
            && self.table_aliases.is_empty()
            && self.column_aliases.is_empty()
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.orchestrator.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::Config(format!(
                "orchestrator.confidence_threshold must be within [0, 1], got {threshold}"
            )));
        }
        if self.verify.repo_source_tool.trim().is_empty() {
            return Err(PipelineError::Config(
                "verify.repo_source_tool must not be empty".to_string(),
            ));
        }
        if self.verify.db_source_tool.trim().is_empty() {
            return Err(PipelineError::Config(
                "verify.db_source_tool must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Glossary overrides for normalization, `None` when the section is empty.
    pub fn glossary_overrides(&self) -> Option<TermGlossary> {
        if self.glossary.is_empty() {
            return None;
        }
        Some(TermGlossary::from_maps(
            &self.glossary.service_aliases,
            &self.glossary.table_aliases,
            &self.glossary.column_aliases,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.orchestrator.confidence_threshold, 0.7);
        assert!(config.orchestrator.require_evidence);
        assert_eq!(config.orchestrator.max_verify_attempts, 2);
        assert_eq!(config.verify.repo_source_tool, "repo-search");
        assert!(config.glossary_overrides().is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [orchestrator]
            confidence_threshold = 0.5
            max_normalize_attempts = 3

            [verify]
            default_schema = "public"

            [glossary.table_aliases]
            "Payments Book" = "payment_ledger"
            "#,
        )
        .unwrap();
        assert_eq!(config.orchestrator.confidence_threshold, 0.5);
        assert_eq!(config.orchestrator.max_normalize_attempts, 3);
        assert_eq!(config.orchestrator.max_verify_attempts, 2);
        assert_eq!(config.verify.default_schema.as_deref(), Some("public"));
        assert_eq!(config.verify.db_source_tool, "db-introspect");

        let glossary = config.glossary_overrides().unwrap();
        assert_eq!(glossary.canonical_table("payments  book"), "payment_ledger");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = PipelineConfig::from_toml_str("[orchestrator]\nconfidence_threshold = 1.5\n")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn blank_tool_tag_is_rejected() {
        let err = PipelineConfig::from_toml_str("[verify]\nrepo_source_tool = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("repo_source_tool"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PipelineConfig::from_toml_str("[orchestrator\n").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse(_)));
    }
}
