use crudmap_normalize::{
    sanitize_identifier, CrudVerb, NormalizationRequest, NormalizeStage, Normalizer, TermGlossary,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn request() -> impl Strategy<Value = NormalizationRequest> {
    (
        "[A-Za-z _.-]{0,60}",
        proptest::option::of("[A-Za-z ]{1,16}"),
        proptest::option::of("[A-Za-z_ ]{1,16}"),
        proptest::collection::vec("[A-Za-z_ -]{0,12}", 0..3),
    )
        .prop_map(|(description, service, table, columns)| {
            let mut request = NormalizationRequest::new(description).with_columns(columns);
            request.service = service;
            request.table_hint = table;
            request
        })
}

proptest! {
    #[test]
    fn confidence_stays_within_bounds(requests in proptest::collection::vec(request(), 0..6)) {
        let actions = Normalizer::default().normalize(&requests, Some("order api"), None);
        prop_assert_eq!(actions.len(), requests.len());
        for action in &actions.actions {
            prop_assert!(action.confidence >= 0.35 + 0.15 + 0.05 + 0.05 - 1e-9);
            prop_assert!(action.confidence <= 1.0);
            prop_assert!(action.columns.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn normalization_is_deterministic(requests in proptest::collection::vec(request(), 0..6)) {
        let normalizer = Normalizer::default();
        prop_assert_eq!(
            normalizer.normalize(&requests, None, None),
            normalizer.normalize(&requests, None, None)
        );
    }

    #[test]
    fn sanitized_identifiers_are_lowercase_words(raw in "\\PC{0,40}") {
        let cleaned = sanitize_identifier(&raw);
        prop_assert!(!cleaned.starts_with('_') && !cleaned.ends_with('_'));
        prop_assert!(!cleaned.contains("__"));
        prop_assert!(cleaned.chars().all(|c| c == '_' || c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}

#[test]
fn batch_preserves_input_order() {
    init_logging();
    let requests = vec![
        NormalizationRequest::new("Order API adds a payment to the ledger").with_service("order api"),
        NormalizationRequest::new("ReportJob reads the audit trail"),
        NormalizationRequest::new("BillingService toggles the status flag"),
    ];
    let actions = Normalizer::default().normalize(&requests, None, None);
    let summary: Vec<(String, String, CrudVerb)> = actions
        .actions
        .iter()
        .map(|a| (a.service.clone(), a.table.clone(), a.verb))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("OrderAPI".to_string(), "billing_ledger".to_string(), CrudVerb::Insert),
            ("ReportJob".to_string(), "audit_log".to_string(), CrudVerb::Select),
            ("BillingService".to_string(), "observations".to_string(), CrudVerb::Update),
        ]
    );
}

#[test]
fn stage_trait_matches_inherent_normalize() {
    init_logging();
    let normalizer = Normalizer::new(TermGlossary::builtin());
    let requests = vec![NormalizationRequest::new("purge the session store")];
    let via_trait = NormalizeStage::normalize(&normalizer, &requests, None, None).unwrap();
    assert_eq!(via_trait, normalizer.normalize(&requests, None, None));
}
