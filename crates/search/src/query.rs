use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameters shared by every repository search adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub pattern: String,

    /// Include-only path prefixes or globs
    #[serde(default)]
    pub paths: Vec<String>,

    /// Adapter specific flags, passed through untouched
    #[serde(default)]
    pub flags: Vec<String>,

    #[serde(default)]
    pub context_lines: usize,
}

impl SearchQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Same paths, flags and context, different pattern.
    pub fn with_pattern(&self, pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..self.clone()
        }
    }

    pub fn with_paths<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_flags<S: Into<String>>(mut self, flags: impl IntoIterator<Item = S>) -> Self {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }
}

/// One normalized search match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoHit {
    pub path: String,
    pub line_number: u64,
    pub line: String,

    #[serde(default)]
    pub context_before: Vec<String>,

    #[serde(default)]
    pub context_after: Vec<String>,

    #[serde(default)]
    pub score: Option<f64>,

    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl RepoHit {
    pub fn new(path: impl Into<String>, line_number: u64, line: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line_number,
            line: line.into(),
            context_before: Vec::new(),
            context_after: Vec::new(),
            score: None,
            metadata: BTreeMap::new(),
        }
    }

    /// `path:L<line>` locator used for code evidence
    pub fn locator(&self) -> String {
        format!("{}:L{}", self.path, self.line_number)
    }
}
