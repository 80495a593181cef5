use crate::action::{CrudAction, CrudActionList, CrudVerb};
use crate::error::Result;
use crate::glossary::TermGlossary;
use crate::request::NormalizationRequest;
use crate::safety::{mask_pii, DEFAULT_MASK_LENGTH};
use crate::stage::NormalizeStage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Verb keyword table, evaluated top to bottom; the first phrase found in the text wins.
const ACTION_KEYWORDS: &[(CrudVerb, &[&str], f64)] = &[
    (
        CrudVerb::Insert,
        &[
            "add", "adding", "append", "create", "creating", "insert", "inserting",
            "new record", "persist", "record a", "write", "writing",
        ],
        0.35,
    ),
    (
        CrudVerb::Update,
        &[
            "bump", "flip", "modify", "patch", "refresh", "set", "toggle", "update", "updating",
        ],
        0.35,
    ),
    (
        CrudVerb::Delete,
        &[
            "cleanup", "clear", "delete", "deleting", "drop", "prune", "purge", "remove", "scrub",
            "truncate",
        ],
        0.35,
    ),
    (
        CrudVerb::Select,
        &[
            "check", "fetch", "inspect", "lookup", "query", "read", "scan", "select", "validate",
        ],
        0.25,
    ),
];

const BASE_CONFIDENCE: f64 = 0.35;
const DEFAULT_ACTION_SCORE: f64 = 0.15;

const TABLE_HINT_SCORE: f64 = 0.25;
const TABLE_ALIAS_SCORE: f64 = 0.25;
const TABLE_PHRASE_SCORE: f64 = 0.2;
const TABLE_FALLBACK_SCORE: f64 = 0.05;
const FALLBACK_TABLE: &str = "observations";

const SERVICE_HINT_SCORE: f64 = 0.2;
const SERVICE_CAMEL_SCORE: f64 = 0.15;
const SERVICE_DEFAULT_SCORE: f64 = 0.1;
const SERVICE_FALLBACK_SCORE: f64 = 0.05;
const FALLBACK_SERVICE: &str = "UnknownService";
const SERVICE_SUFFIXES: [&str; 3] = ["Service", "Job", "Worker"];

const KEY_WORDS: [&str; 4] = ["key", "identifier", "id", "primary"];

static TABLE_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z0-9_]+)\s+table").expect("table regex must compile"));
static CAMEL_CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][A-Za-z0-9]+(?:Service|Job|Worker)?)").expect("service regex must compile")
});
static ID_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z0-9_]+)_id").expect("id regex must compile"));
static NON_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9a-zA-Z_]+").expect("identifier regex must compile"));
static UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("underscore regex must compile"));

/// Keyword and regex heuristics for CRUD normalization.
///
/// Pure and deterministic: the same requests, default service and glossary always yield
/// the same actions, in request order.
#[derive(Debug, Clone)]
pub struct Normalizer {
    glossary: TermGlossary,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(TermGlossary::builtin())
    }
}

impl Normalizer {
    pub fn new(glossary: TermGlossary) -> Self {
        Self { glossary }
    }

    pub fn glossary(&self) -> &TermGlossary {
        &self.glossary
    }

    pub fn normalize(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> CrudActionList {
        let glossary = self.glossary.merge(glossary_overrides);
        let actions = requests
            .iter()
            .map(|request| normalize_one(request, &glossary, default_service))
            .collect();
        CrudActionList::new(actions)
    }
}

impl NormalizeStage for Normalizer {
    fn normalize(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> Result<CrudActionList> {
        Ok(Normalizer::normalize(
            self,
            requests,
            default_service,
            glossary_overrides,
        ))
    }
}

fn normalize_one(
    request: &NormalizationRequest,
    glossary: &TermGlossary,
    default_service: Option<&str>,
) -> CrudAction {
    let text = request.description.as_str();
    let (verb, action_score) = infer_action(text);
    let (table, table_score) = infer_table(text, request.table_hint.as_deref(), glossary);
    let (service, service_score) =
        infer_service(text, request.service.as_deref(), glossary, default_service);
    let columns = infer_columns(text, &request.columns_hint, glossary);
    let where_keys = infer_where_keys(text, &request.where_hint, glossary);
    let confidence = (BASE_CONFIDENCE + action_score + table_score + service_score).min(1.0);

    log::debug!(
        "Normalized '{}' -> {} {} on {} ({:.2})",
        mask_pii(text, DEFAULT_MASK_LENGTH),
        service,
        verb,
        table,
        confidence
    );

    CrudAction {
        service,
        table,
        verb,
        columns,
        where_keys,
        code_locations: request.code_locations(),
        confidence,
    }
}

pub(crate) fn infer_action(text: &str) -> (CrudVerb, f64) {
    let lowered = text.to_lowercase();
    for (verb, keywords, score) in ACTION_KEYWORDS {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return (*verb, *score);
        }
    }
    (CrudVerb::Select, DEFAULT_ACTION_SCORE)
}

fn infer_table(text: &str, hint: Option<&str>, glossary: &TermGlossary) -> (String, f64) {
    if let Some(hint) = hint.filter(|hint| !hint.is_empty()) {
        return (glossary.canonical_table(hint), TABLE_HINT_SCORE);
    }

    let lowered = text.to_lowercase();
    if let Some((_, canonical)) = glossary
        .table_aliases
        .iter()
        .find(|(alias, _)| lowered.contains(alias))
    {
        return (canonical.to_string(), TABLE_ALIAS_SCORE);
    }

    if let Some(captures) = TABLE_PHRASE.captures(text) {
        let name = sanitize_identifier(&captures[1]);
        return (glossary.canonical_table(&name), TABLE_PHRASE_SCORE);
    }

    (glossary.canonical_table(FALLBACK_TABLE), TABLE_FALLBACK_SCORE)
}

fn infer_service(
    text: &str,
    provided: Option<&str>,
    glossary: &TermGlossary,
    default_service: Option<&str>,
) -> (String, f64) {
    if let Some(service) = provided.filter(|service| !service.is_empty()) {
        return (glossary.canonical_service(service), SERVICE_HINT_SCORE);
    }

    // Only the first capitalized word is considered; "Nightly OrderAPI" is not rescued.
    if let Some(captures) = CAMEL_CASE.captures(text) {
        let candidate = &captures[1];
        let has_suffix = SERVICE_SUFFIXES
            .iter()
            .any(|suffix| candidate.ends_with(suffix));
        let has_inner_upper = candidate.chars().skip(1).any(char::is_uppercase);
        if has_suffix || has_inner_upper {
            return (glossary.canonical_service(candidate), SERVICE_CAMEL_SCORE);
        }
    }

    if let Some(service) = default_service.filter(|service| !service.is_empty()) {
        return (glossary.canonical_service(service), SERVICE_DEFAULT_SCORE);
    }

    (FALLBACK_SERVICE.to_string(), SERVICE_FALLBACK_SCORE)
}

fn infer_columns(text: &str, hints: &[String], glossary: &TermGlossary) -> Vec<String> {
    let mut candidates: Vec<String> = hints.iter().map(|hint| sanitize_identifier(hint)).collect();

    let lowered = text.to_lowercase();
    candidates.extend(
        glossary
            .column_aliases
            .iter()
            .filter(|(alias, _)| lowered.contains(alias))
            .map(|(_, canonical)| canonical.to_string()),
    );
    candidates.extend(
        ID_SUFFIX
            .captures_iter(text)
            .map(|captures| sanitize_identifier(&format!("{}_id", &captures[1]))),
    );

    unique_canonical_columns(candidates, glossary)
}

fn infer_where_keys(text: &str, hints: &[String], glossary: &TermGlossary) -> Vec<String> {
    let mut candidates: Vec<String> = hints.iter().map(|hint| sanitize_identifier(hint)).collect();

    let lowered = text.to_lowercase();
    let mentions_key = KEY_WORDS.iter().any(|word| lowered.contains(word));
    if mentions_key && !candidates.iter().any(|candidate| candidate == "id") {
        candidates.push("id".to_string());
    }

    unique_canonical_columns(candidates, glossary)
}

fn unique_canonical_columns(candidates: Vec<String>, glossary: &TermGlossary) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|candidate| glossary.canonical_column(&candidate))
        .filter(|column| !column.is_empty())
        .filter(|column| seen.insert(column.clone()))
        .collect()
}

/// Runs of non-identifier characters become `_`, repeats collapse, edges trimmed, lowercased.
pub fn sanitize_identifier(value: &str) -> String {
    let cleaned = NON_IDENTIFIER.replace_all(value.trim(), "_");
    let collapsed = UNDERSCORES.replace_all(&cleaned, "_");
    collapsed.trim_matches('_').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize_text(request: NormalizationRequest) -> CrudAction {
        Normalizer::default()
            .normalize(&[request], None, None)
            .actions
            .remove(0)
    }

    #[test]
    fn sanitizes_identifiers() {
        assert_eq!(sanitize_identifier("  Checkout--Total!! "), "checkout_total");
        assert_eq!(sanitize_identifier("__a__b__"), "a_b");
        assert_eq!(sanitize_identifier("!!!"), "");
    }

    #[test]
    fn verb_table_order_decides_ties() {
        // "update" and "delete" both appear; UPDATE is checked first
        assert_eq!(infer_action("delete then update rows").0, CrudVerb::Update);
        assert_eq!(infer_action("Fetch totals"), (CrudVerb::Select, 0.25));
        assert_eq!(infer_action("nothing to see"), (CrudVerb::Select, 0.15));
    }

    #[test]
    fn substring_matching_is_literal() {
        // "address" contains "add"
        assert_eq!(infer_action("reads the address").0, CrudVerb::Insert);
    }

    #[test]
    fn hinted_request_scores_highest_tiers() {
        let action = normalize_text(
            NormalizationRequest::new("Order API persists checkout totals into billing ledger")
                .with_service("order api")
                .with_table_hint("ledger")
                .with_columns(["Checkout Total"])
                .with_where_keys(["order_id"]),
        );
        assert_eq!(action.service, "OrderAPI");
        assert_eq!(action.table, "billing_ledger");
        assert_eq!(action.verb, CrudVerb::Insert);
        assert_eq!(action.columns, vec!["checkout_total"]);
        assert_eq!(action.where_keys, vec!["order_id"]);
        assert!((action.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn table_phrase_and_camel_case_service() {
        let action = normalize_text(NormalizationRequest::new(
            "InvoiceWorker scans the Payments table nightly",
        ));
        assert_eq!(action.service, "InvoiceWorker");
        assert_eq!(action.table, "payments");
        assert_eq!(action.verb, CrudVerb::Select);
        assert!((action.confidence - (0.35 + 0.25 + 0.2 + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn fallbacks_apply_when_nothing_is_known() {
        let action = normalize_text(NormalizationRequest::new("something happens"));
        assert_eq!(action.service, "UnknownService");
        assert_eq!(action.table, "observations");
        assert_eq!(action.verb, CrudVerb::Select);
        assert!((action.confidence - (0.35 + 0.15 + 0.05 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn plain_capitalized_word_is_not_a_service() {
        let normalizer = Normalizer::default();
        let actions = normalizer.normalize(
            &[NormalizationRequest::new("Nightly job prunes the session store")],
            Some("billing svc"),
            None,
        );
        let action = &actions.actions[0];
        assert_eq!(action.service, "BillingService");
        assert_eq!(action.table, "session_store");
        assert_eq!(action.verb, CrudVerb::Delete);
    }

    #[test]
    fn glossary_columns_and_id_suffixes_are_collected() {
        let action = normalize_text(NormalizationRequest::new(
            "BillingService sets the status flag by customer_id and customer_id again",
        ));
        assert_eq!(action.columns, vec!["status_flag", "customer_id"]);
        assert_eq!(action.where_keys, vec!["id"]);
    }

    #[test]
    fn overrides_change_resolution_without_touching_builtin() {
        let normalizer = Normalizer::default();
        let overrides = TermGlossary::new(
            Default::default(),
            [("ledger", "finance.ledger_v2")].into_iter().collect(),
            Default::default(),
        );
        let request = NormalizationRequest::new("append to the ledger");
        let overridden = normalizer.normalize(&[request.clone()], None, Some(&overrides));
        assert_eq!(overridden.actions[0].table, "finance.ledger_v2");
        let plain = normalizer.normalize(&[request], None, None);
        assert_eq!(plain.actions[0].table, "billing_ledger");
    }

    #[test]
    fn empty_glossary_disables_aliases() {
        let action = Normalizer::new(TermGlossary::default())
            .normalize(&[NormalizationRequest::new("append to the ledger")], None, None)
            .actions
            .remove(0);
        assert_eq!(action.table, "observations");
    }
}
