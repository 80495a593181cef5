use crate::adapter::SearchAdapter;
use crate::error::{Result, SearchError};
use crate::query::{RepoHit, SearchQuery};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs `rg --json` (or a compatible tool) and normalizes its event stream.
#[derive(Debug, Clone)]
pub struct RipgrepSearch {
    command: Vec<String>,
    cwd: Option<PathBuf>,
}

impl RipgrepSearch {
    /// `command[0]` must be on the allowlist, either verbatim or by file name.
    pub fn new<S: AsRef<str>>(command: Vec<String>, allowed_commands: &[S]) -> Result<Self> {
        let Some(executable) = command.first() else {
            return Err(SearchError::Other(
                "Search command requires at least an executable".to_string(),
            ));
        };
        let file_name = Path::new(executable)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(executable.as_str());
        let allowed = allowed_commands
            .iter()
            .any(|candidate| candidate.as_ref() == executable || candidate.as_ref() == file_name);
        if !allowed {
            return Err(SearchError::CommandNotAllowed(executable.clone()));
        }
        Ok(Self { command, cwd: None })
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Pattern goes after `-e` and paths after `--`, so neither parses as an option.
    fn args(&self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = self.command[1..].to_vec();
        args.extend(query.flags.iter().cloned());
        args.push("-e".to_string());
        args.push(query.pattern.clone());
        args.push("--".to_string());
        args.extend(query.paths.iter().cloned());
        args
    }
}

impl SearchAdapter for RipgrepSearch {
    fn search(&self, query: &SearchQuery) -> Result<Vec<RepoHit>> {
        if query.pattern.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let mut command = Command::new(&self.command[0]);
        command.args(self.args(query));
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let output = command.output()?;
        let status = output.status.code().unwrap_or(-1);
        // rg exits 1 when nothing matched
        if status != 0 && status != 1 {
            return Err(SearchError::CommandFailed {
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_ripgrep_json(&stdout, query.context_lines))
    }
}

/// Convert a ripgrep `--json` event stream into hits.
///
/// Context events preceding a match are kept (up to `context_lines`) as its
/// `context_before`. Unparseable lines and unknown events are skipped.
pub fn parse_ripgrep_json(stdout: &str, context_lines: usize) -> Vec<RepoHit> {
    let mut hits = Vec::new();
    let mut context: VecDeque<String> = VecDeque::new();
    let mut current_path: Option<String> = None;

    for raw in stdout.lines() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let Ok(event) = serde_json::from_str::<Value>(raw) else {
            continue;
        };
        let (Some(kind), Some(data)) = (event.get("type").and_then(Value::as_str), event.get("data"))
        else {
            continue;
        };

        match kind {
            "begin" => {
                current_path = text_field(data, "path");
                context.clear();
            }
            "context" => {
                if context_lines == 0 {
                    continue;
                }
                if let Some(line) = text_field(data, "lines") {
                    if context.len() == context_lines {
                        context.pop_front();
                    }
                    context.push_back(line.trim_end_matches('\n').to_string());
                }
            }
            "match" => {
                let path = text_field(data, "path").or_else(|| current_path.clone());
                let line_number = data.get("line_number").and_then(Value::as_u64);
                if let (Some(path), Some(line_number)) = (path, line_number) {
                    let line = text_field(data, "lines").unwrap_or_default();
                    let mut hit = RepoHit::new(path, line_number, line.trim_end_matches('\n'));
                    hit.context_before = context.iter().cloned().collect();
                    if let Some(submatches) = data.get("submatches").filter(|v| !is_empty(v)) {
                        hit.metadata
                            .insert("submatches".to_string(), submatches.clone());
                    }
                    hits.push(hit);
                }
                context.clear();
            }
            _ => {}
        }
    }

    hits
}

fn text_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(|entry| entry.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
