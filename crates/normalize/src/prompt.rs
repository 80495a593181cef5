use crate::action::{CrudAction, CrudVerb};
use crate::glossary::{AliasMap, TermGlossary};

const PROMPT_HEADER: &str = "Turn ambiguous CRUD descriptions into structured actions. \
Resolve alias terms to their canonical identifiers with the glossary below and keep the \
output deterministic.";

/// Worked example embedded in the system prompt
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationFewShot {
    pub description: String,
    pub action: CrudAction,
}

impl NormalizationFewShot {
    /// `VERB on table (service S)`
    pub fn summary(&self) -> String {
        format!(
            "{} on {} (service {})",
            self.action.verb, self.action.table, self.action.service
        )
    }
}

pub fn default_few_shots() -> Vec<NormalizationFewShot> {
    vec![
        NormalizationFewShot {
            description: "Order API persists checkout totals into billing_ledger".to_string(),
            action: CrudAction {
                service: "OrderAPI".to_string(),
                table: "billing_ledger".to_string(),
                verb: CrudVerb::Insert,
                columns: vec!["checkout_total".to_string()],
                where_keys: vec!["order_id".to_string()],
                code_locations: Vec::new(),
                confidence: 0.8,
            },
        },
        NormalizationFewShot {
            description: "Nightly vacuum prunes stale sessions from session_store".to_string(),
            action: CrudAction {
                service: "SessionSweeper".to_string(),
                table: "session_store".to_string(),
                verb: CrudVerb::Delete,
                columns: Vec::new(),
                where_keys: vec!["last_seen_at".to_string()],
                code_locations: Vec::new(),
                confidence: 0.7,
            },
        },
    ]
}

/// Glossary rendered as sorted `- kind:` sections.
pub fn format_glossary_block(glossary: &TermGlossary) -> String {
    let mut lines = Vec::new();
    push_aliases(&mut lines, "services", &glossary.service_aliases);
    push_aliases(&mut lines, "tables", &glossary.table_aliases);
    push_aliases(&mut lines, "columns", &glossary.column_aliases);
    lines.join("\n")
}

fn push_aliases(lines: &mut Vec<String>, label: &str, aliases: &AliasMap) {
    lines.push(format!("- {label}:"));
    for (alias, canonical) in aliases.sorted() {
        lines.push(format!("  - '{alias}' -> '{canonical}'"));
    }
}

pub fn format_few_shot_block(few_shots: &[NormalizationFewShot]) -> String {
    few_shots
        .iter()
        .flat_map(|shot| {
            [
                format!("- input: {}", shot.description),
                format!("  output: {}", shot.summary()),
            ]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Header, glossary and examples joined into one system prompt.
pub fn build_normalization_system_prompt(
    glossary: &TermGlossary,
    few_shots: &[NormalizationFewShot],
) -> String {
    let examples = format_few_shot_block(few_shots);
    let examples_section = if examples.is_empty() {
        "Examples:".to_string()
    } else {
        format!("Examples:\n{examples}")
    };
    [
        PROMPT_HEADER.to_string(),
        format_glossary_block(glossary),
        examples_section,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn glossary_block_is_sorted_per_section() {
        let block = format_glossary_block(&TermGlossary::builtin());
        assert_eq!(
            block,
            "- services:\n\
             \x20 - 'billing svc' -> 'BillingService'\n\
             \x20 - 'order api' -> 'OrderAPI'\n\
             - tables:\n\
             \x20 - 'audit trail' -> 'audit_log'\n\
             \x20 - 'ledger' -> 'billing_ledger'\n\
             \x20 - 'session store' -> 'session_store'\n\
             - columns:\n\
             \x20 - 'checkout total' -> 'checkout_total'\n\
             \x20 - 'status flag' -> 'status_flag'"
        );
    }

    #[test]
    fn few_shot_summaries_name_verb_table_and_service() {
        let shots = default_few_shots();
        assert_eq!(shots[0].summary(), "INSERT on billing_ledger (service OrderAPI)");
        assert_eq!(shots[1].summary(), "DELETE on session_store (service SessionSweeper)");
    }

    #[test]
    fn prompt_is_deterministic() {
        let glossary = TermGlossary::builtin();
        let shots = default_few_shots();
        let first = build_normalization_system_prompt(&glossary, &shots);
        let second = build_normalization_system_prompt(&glossary, &shots);
        assert_eq!(first, second);
        assert!(first.starts_with(PROMPT_HEADER));
        assert!(first.contains("- input: Order API persists checkout totals into billing_ledger"));
    }

    #[test]
    fn empty_examples_keep_the_section_heading() {
        let prompt = build_normalization_system_prompt(&TermGlossary::default(), &[]);
        assert!(prompt.ends_with("- columns:\nExamples:"));
    }
}
