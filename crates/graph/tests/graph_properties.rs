use crudmap_graph::{
    calculate_confidence, merge_graphs, Edge, EdgeType, Evidence, EvidenceKind, Graph, GraphError,
    Node, NodeType, CONFIRMED_THRESHOLD,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn evidence_kind() -> impl Strategy<Value = EvidenceKind> {
    prop_oneof![
        Just(EvidenceKind::Code),
        Just(EvidenceKind::Spec),
        Just(EvidenceKind::Log),
        Just(EvidenceKind::Trace),
        Just(EvidenceKind::Config),
    ]
}

fn evidence_item() -> impl Strategy<Value = Evidence> {
    (
        evidence_kind(),
        "[a-z]{1,8}\\.py:L[0-9]{1,3}",
        proptest::option::of(prop_oneof![
            Just(String::new()),
            Just("ripgrep".to_string()),
            Just("otel".to_string()),
            Just("pg".to_string()),
        ]),
    )
        .prop_map(|(kind, locator, tool)| {
            let item = Evidence::new(kind, locator);
            match tool {
                Some(tool) => item.with_tool(tool),
                None => item,
            }
        })
}

fn edge_type() -> impl Strategy<Value = EdgeType> {
    prop_oneof![Just(EdgeType::Reads), Just(EdgeType::Writes), Just(EdgeType::Calls)]
}

fn small_graph() -> impl Strategy<Value = Graph> {
    proptest::collection::vec(
        (0usize..3, 0usize..3, edge_type(), 0.0f64..=1.0, proptest::collection::vec(evidence_item(), 0..3)),
        0..6,
    )
    .prop_map(|raw_edges| {
        let services = ["service:A", "service:B", "service:C"];
        let tables = ["table:default:t0", "table:default:t1", "table:default:t2"];
        let mut nodes: Vec<Node> = services
            .iter()
            .map(|id| Node::new(*id, NodeType::Service, &id[8..]))
            .collect();
        nodes.extend(tables.iter().map(|id| Node::new(*id, NodeType::DbTable, &id[14..])));
        let edges = raw_edges
            .into_iter()
            .map(|(from, to, kind, confidence, evidence)| {
                Edge::new(services[from], tables[to], kind, confidence).with_evidence(evidence)
            })
            .collect();
        Graph::new(nodes, edges).unwrap()
    })
}

proptest! {
    #[test]
    fn score_stays_in_unit_interval(
        evidence in proptest::collection::vec(evidence_item(), 0..8),
        collision in any::<bool>(),
    ) {
        let result = calculate_confidence(&evidence, collision);
        prop_assert!((0.0..=1.0).contains(&result.score));
        prop_assert_eq!(result.confirmed, result.score >= CONFIRMED_THRESHOLD);
    }

    #[test]
    fn score_ignores_evidence_order(
        (evidence, shuffled) in proptest::collection::vec(evidence_item(), 0..8)
            .prop_flat_map(|evidence| (Just(evidence.clone()), Just(evidence).prop_shuffle())),
        collision in any::<bool>(),
    ) {
        let original = calculate_confidence(&evidence, collision);
        let permuted = calculate_confidence(&shuffled, collision);
        prop_assert_eq!(original, permuted);
    }

    #[test]
    fn bonuses_apply_at_most_once(evidence in proptest::collection::vec(evidence_item(), 0..12)) {
        let result = calculate_confidence(&evidence, false);
        let mut reasons: Vec<&str> = result.contributions.iter().map(|c| c.reason.as_str()).collect();
        let total = reasons.len();
        reasons.dedup();
        prop_assert_eq!(reasons.len(), total);
    }

    #[test]
    fn merging_a_graph_with_itself_is_stable(graph in small_graph()) {
        let once = merge_graphs([&graph]).unwrap();
        let twice = merge_graphs([&graph, &graph]).unwrap();
        prop_assert_eq!(&once, &twice);
        let again = merge_graphs([&once]).unwrap();
        prop_assert_eq!(once, again);
    }
}

#[test]
fn duplicate_node_id_fails_construction() {
    let nodes = vec![
        Node::new("table:default:orders", NodeType::DbTable, "orders"),
        Node::new("table:default:orders", NodeType::DbTable, "orders_copy"),
    ];
    let err = Graph::new(nodes, Vec::new()).unwrap_err();
    assert!(err.to_string().contains("table:default:orders"));
}

#[test]
fn unknown_endpoints_are_listed_sorted() {
    let nodes = vec![Node::new("service:A", NodeType::Service, "A")];
    let edges = vec![
        Edge::new("service:Z", "service:A", EdgeType::Calls, 0.5),
        Edge::new("service:B", "service:A", EdgeType::Calls, 0.5),
    ];
    match Graph::new(nodes, edges).unwrap_err() {
        GraphError::DanglingEdges {
            missing_sources,
            missing_targets,
        } => {
            assert_eq!(missing_sources, vec!["service:B", "service:Z"]);
            assert!(missing_targets.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn two_distinct_tools_trigger_agreement_once() {
    let evidence = vec![
        Evidence::new(EvidenceKind::Code, "a.py:L1").with_tool("ripgrep"),
        Evidence::new(EvidenceKind::Code, "b.py:L2").with_tool("ripgrep"),
        Evidence::new(EvidenceKind::Config, "db:orders").with_tool("pg"),
    ];
    let result = calculate_confidence(&evidence, false);
    let agreements = result
        .contributions
        .iter()
        .filter(|c| c.reason == "multi-tool-agreement")
        .count();
    assert_eq!(agreements, 1);
    assert!((result.score - 0.5).abs() < 1e-9);
}

#[test]
fn name_collision_can_drop_an_edge_below_confirmation() {
    // 0.3 static + 0.3 runtime + 0.2 agreement - 0.2 collision = 0.6, below the bar
    let evidence = vec![
        Evidence::new(EvidenceKind::Code, "a.py:L1").with_tool("ripgrep"),
        Evidence::new(EvidenceKind::Log, "app.log:L5").with_tool("loki"),
    ];
    let collided = calculate_confidence(&evidence, true);
    assert!(!collided.confirmed);

    let clean = calculate_confidence(&evidence, false);
    assert!(clean.score >= 0.7);
    assert!(clean.confirmed);
}
