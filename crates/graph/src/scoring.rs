use crate::types::Evidence;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bonus for code, spec or config evidence
pub const STATIC_BONUS: f64 = 0.3;
/// Bonus for log or trace evidence
pub const RUNTIME_BONUS: f64 = 0.3;
/// Bonus when enough distinct tools agree
pub const MULTI_TOOL_BONUS: f64 = 0.2;
/// Penalty when the target name is ambiguous
pub const NAME_COLLISION_PENALTY: f64 = -0.2;
/// Distinct source tools needed for the agreement bonus
pub const MULTI_TOOL_AGREEMENT_THRESHOLD: usize = 2;
/// Minimum score for an edge to count as confirmed
pub const CONFIRMED_THRESHOLD: f64 = 0.7;

/// One named delta applied while scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceContribution {
    pub reason: String,
    pub delta: f64,
}

impl ConfidenceContribution {
    fn new(reason: &str, delta: f64) -> Self {
        Self {
            reason: reason.to_string(),
            delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    /// Clamped to [0, 1]
    pub score: f64,
    pub confirmed: bool,
    /// Deltas in application order: static, runtime, multi-tool, collision
    pub contributions: Vec<ConfidenceContribution>,
}

/// Score an evidence set.
///
/// The result depends only on the set: permuting `evidence` never changes it.
pub fn calculate_confidence(evidence: &[Evidence], has_name_collision: bool) -> ConfidenceResult {
    let mut contributions = Vec::new();
    let mut score = 0.0;

    if evidence.iter().any(|item| item.kind.is_static()) {
        score += STATIC_BONUS;
        contributions.push(ConfidenceContribution::new("static-analysis-evidence", STATIC_BONUS));
    }

    if evidence.iter().any(|item| item.kind.is_runtime()) {
        score += RUNTIME_BONUS;
        contributions.push(ConfidenceContribution::new("runtime-evidence", RUNTIME_BONUS));
    }

    let tools: HashSet<&str> = evidence
        .iter()
        .filter_map(|item| item.source_tool.as_deref())
        .filter(|tool| !tool.is_empty())
        .collect();
    if tools.len() >= MULTI_TOOL_AGREEMENT_THRESHOLD {
        score += MULTI_TOOL_BONUS;
        contributions.push(ConfidenceContribution::new("multi-tool-agreement", MULTI_TOOL_BONUS));
    }

    if has_name_collision {
        score += NAME_COLLISION_PENALTY;
        contributions.push(ConfidenceContribution::new(
            "name-collision",
            NAME_COLLISION_PENALTY,
        ));
    }

    let score = score.clamp(0.0, 1.0);
    ConfidenceResult {
        score,
        confirmed: score >= CONFIRMED_THRESHOLD,
        contributions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EvidenceKind;
    use pretty_assertions::assert_eq;

    fn reasons(result: &ConfidenceResult) -> Vec<&str> {
        result.contributions.iter().map(|c| c.reason.as_str()).collect()
    }

    #[test]
    fn empty_evidence_scores_zero() {
        let result = calculate_confidence(&[], false);
        assert_eq!(result.score, 0.0);
        assert!(!result.confirmed);
        assert!(result.contributions.is_empty());
    }

    #[test]
    fn static_and_runtime_from_distinct_tools_confirms() {
        let evidence = vec![
            Evidence::new(EvidenceKind::Code, "svc/orders.py:L10").with_tool("ripgrep"),
            Evidence::new(EvidenceKind::Trace, "trace:abc").with_tool("otel"),
        ];
        let result = calculate_confidence(&evidence, false);
        assert!((result.score - 0.8).abs() < 1e-9);
        assert!(result.confirmed);
        assert_eq!(
            reasons(&result),
            vec!["static-analysis-evidence", "runtime-evidence", "multi-tool-agreement"]
        );
    }

    #[test]
    fn name_collision_subtracts() {
        let evidence = vec![Evidence::new(EvidenceKind::Config, "db:orders")];
        let result = calculate_confidence(&evidence, true);
        assert!((result.score - 0.1).abs() < 1e-9);
        assert_eq!(reasons(&result), vec!["static-analysis-evidence", "name-collision"]);
    }

    #[test]
    fn collision_alone_clamps_to_zero() {
        let result = calculate_confidence(&[], true);
        assert_eq!(result.score, 0.0);
        assert_eq!(reasons(&result), vec!["name-collision"]);
    }

    #[test]
    fn same_tool_twice_does_not_count_as_agreement() {
        let evidence = vec![
            Evidence::new(EvidenceKind::Code, "a.py:L1").with_tool("rg"),
            Evidence::new(EvidenceKind::Log, "app.log:L7").with_tool("rg"),
            Evidence::new(EvidenceKind::Log, "app.log:L9").with_tool(""),
        ];
        let result = calculate_confidence(&evidence, false);
        assert!((result.score - 0.6).abs() < 1e-9);
        assert!(!result.confirmed);
    }
}
