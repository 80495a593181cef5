use crate::error::Result;
use crate::types::{Edge, Graph, Node, DEFAULT_SCHEMA_VERSION};
use std::collections::BTreeMap;

/// Union several graphs into one.
///
/// Nodes are keyed by id: the first occurrence keeps its type and name while later
/// occurrences merge their attrs over it. Edges are keyed by (from, to, type): evidence is
/// unioned by fingerprint in first-seen order and the highest confidence wins. Output is
/// sorted so that merging the same inputs always yields the same document.
pub fn merge_graphs<'a, I>(graphs: I) -> Result<Graph>
where
    I: IntoIterator<Item = &'a Graph>,
{
    let mut nodes: BTreeMap<String, Node> = BTreeMap::new();
    let mut edges: BTreeMap<(String, String, &'static str), Edge> = BTreeMap::new();
    let mut schema_version: Option<String> = None;
    let mut sources = 0usize;

    for graph in graphs {
        sources += 1;
        if schema_version.is_none() && !graph.schema_version().is_empty() {
            schema_version = Some(graph.schema_version().to_string());
        }

        for node in graph.nodes() {
            match nodes.get_mut(&node.id) {
                Some(existing) => {
                    for (key, value) in &node.attrs {
                        existing.attrs.insert(key.clone(), value.clone());
                    }
                }
                None => {
                    nodes.insert(node.id.clone(), node.clone());
                }
            }
        }

        for edge in graph.edges() {
            let key = (
                edge.from_id.clone(),
                edge.to_id.clone(),
                edge.edge_type.as_str(),
            );
            match edges.get_mut(&key) {
                Some(existing) => absorb_edge(existing, edge),
                None => {
                    edges.insert(key, edge.clone());
                }
            }
        }
    }

    let mut merged_edges: Vec<Edge> = edges.into_values().collect();
    merged_edges.sort_by(|a, b| {
        (a.from_id.as_str(), a.to_id.as_str(), a.edge_type.as_str())
            .cmp(&(b.from_id.as_str(), b.to_id.as_str(), b.edge_type.as_str()))
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });

    log::debug!(
        "Merged {} graphs into {} nodes and {} edges",
        sources,
        nodes.len(),
        merged_edges.len()
    );

    Graph::with_schema_version(
        nodes.into_values().collect(),
        merged_edges,
        schema_version.unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string()),
    )
}

fn absorb_edge(existing: &mut Edge, incoming: &Edge) {
    for item in &incoming.evidence {
        let duplicate = existing
            .evidence
            .iter()
            .any(|known| known.fingerprint() == item.fingerprint());
        if !duplicate {
            existing.evidence.push(item.clone());
        }
    }
    if incoming.confidence > existing.confidence {
        existing.confidence = incoming.confidence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeType, Evidence, EvidenceKind, NodeType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn graph(edge_confidence: f64, evidence: Vec<Evidence>, attr: (&str, &str)) -> Graph {
        let service = Node::new("service:OrderAPI", NodeType::Service, "OrderAPI");
        let table = Node::new("table:public:orders", NodeType::DbTable, "orders")
            .with_attr(attr.0, json!(attr.1));
        let edge = Edge::new(
            "service:OrderAPI",
            "table:public:orders",
            EdgeType::Writes,
            edge_confidence,
        )
        .with_evidence(evidence);
        Graph::new(vec![table, service], vec![edge]).unwrap()
    }

    #[test]
    fn merge_unions_evidence_and_keeps_max_confidence() {
        let shared = Evidence::new(EvidenceKind::Code, "orders.py:L4").with_tool("rg");
        let left = graph(0.6, vec![shared.clone()], ("schema", "public"));
        let right = graph(
            0.9,
            vec![shared, Evidence::new(EvidenceKind::Trace, "span:1").with_tool("otel")],
            ("owner", "payments"),
        );

        let merged = merge_graphs([&left, &right]).unwrap();
        assert_eq!(merged.node_count(), 2);
        assert_eq!(merged.nodes()[0].id, "service:OrderAPI");
        assert_eq!(merged.nodes()[1].attrs.len(), 2);

        let edge = &merged.edges()[0];
        assert_eq!(edge.confidence, 0.9);
        assert_eq!(edge.evidence.len(), 2);
        assert_eq!(edge.evidence[0].locator, "orders.py:L4");
    }

    #[test]
    fn later_attrs_override_earlier_ones() {
        let left = graph(0.5, Vec::new(), ("schema", "public"));
        let right = graph(0.5, Vec::new(), ("schema", "billing"));
        let merged = merge_graphs([&left, &right]).unwrap();
        assert_eq!(merged.nodes()[1].attrs["schema"], json!("billing"));
    }

    #[test]
    fn merging_nothing_yields_default_graph() {
        let merged = merge_graphs(std::iter::empty()).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.schema_version(), DEFAULT_SCHEMA_VERSION);
    }

    #[test]
    fn first_non_empty_schema_version_wins() {
        let a = Graph::with_schema_version(Vec::new(), Vec::new(), "").unwrap();
        let b = Graph::with_schema_version(Vec::new(), Vec::new(), "2.0.0").unwrap();
        let c = Graph::with_schema_version(Vec::new(), Vec::new(), "3.0.0").unwrap();
        let merged = merge_graphs([&a, &b, &c]).unwrap();
        assert_eq!(merged.schema_version(), "2.0.0");
    }
}
