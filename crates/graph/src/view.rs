use crate::types::{Edge, EdgeType, Graph, Node, NodeType};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Read-only petgraph index over a [`Graph`] for dependency queries.
pub struct DependencyView<'a> {
    graph: DiGraph<&'a Node, &'a Edge>,
    index: HashMap<&'a str, NodeIndex>,
}

impl<'a> DependencyView<'a> {
    pub fn new(source: &'a Graph) -> Self {
        let mut graph = DiGraph::with_capacity(source.node_count(), source.edge_count());
        let mut index = HashMap::with_capacity(source.node_count());

        for node in source.nodes() {
            let idx = graph.add_node(node);
            index.insert(node.id.as_str(), idx);
        }

        // Graph construction guarantees both endpoints exist
        for edge in source.edges() {
            if let (Some(&from), Some(&to)) = (
                index.get(edge.from_id.as_str()),
                index.get(edge.to_id.as_str()),
            ) {
                graph.add_edge(from, to, edge);
            }
        }

        Self { graph, index }
    }

    pub fn node(&self, id: &str) -> Option<&'a Node> {
        self.index.get(id).map(|&idx| self.graph[idx])
    }

    /// Services with a WRITES edge into `table_id`
    pub fn writers_of(&self, table_id: &str) -> Vec<&'a Node> {
        self.neighbors(table_id, Direction::Incoming, EdgeType::Writes)
    }

    /// Services with a READS edge into `table_id`
    pub fn readers_of(&self, table_id: &str) -> Vec<&'a Node> {
        self.neighbors(table_id, Direction::Incoming, EdgeType::Reads)
    }

    /// Tables a service reads or writes
    pub fn tables_of(&self, service_id: &str) -> Vec<&'a Node> {
        let Some(&start) = self.index.get(service_id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut tables: Vec<&'a Node> = self
            .graph
            .edges_directed(start, Direction::Outgoing)
            .filter(|e| matches!(e.weight().edge_type, EdgeType::Reads | EdgeType::Writes))
            .map(|e| self.graph[e.target()])
            .filter(|node| node.node_type == NodeType::DbTable)
            .filter(|node| seen.insert(node.id.as_str()))
            .collect();
        tables.sort_by(|a, b| a.id.cmp(&b.id));
        tables
    }

    /// Edges leaving `node_id`, in insertion order
    pub fn outgoing(&self, node_id: &str) -> Vec<&'a Edge> {
        let Some(&start) = self.index.get(node_id) else {
            return Vec::new();
        };
        let mut edges: Vec<&'a Edge> = self
            .graph
            .edges_directed(start, Direction::Outgoing)
            .map(|e| *e.weight())
            .collect();
        // petgraph yields newest first
        edges.reverse();
        edges
    }

    /// Nodes reachable from `node_id` in at most `max_depth` hops, ignoring direction.
    ///
    /// Returns `(node, distance)` sorted by distance then id; the start node is excluded.
    pub fn neighbors_within(&self, node_id: &str, max_depth: usize) -> Vec<(&'a Node, usize)> {
        let Some(&start) = self.index.get(node_id) else {
            return Vec::new();
        };

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.graph.neighbors_undirected(current) {
                if visited.insert(next) {
                    result.push((self.graph[next], depth + 1));
                    queue.push_back((next, depth + 1));
                }
            }
        }

        result.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        result
    }

    fn neighbors(&self, id: &str, direction: Direction, edge_type: EdgeType) -> Vec<&'a Node> {
        let Some(&target) = self.index.get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut nodes: Vec<&'a Node> = self
            .graph
            .edges_directed(target, direction)
            .filter(|e| e.weight().edge_type == edge_type)
            .map(|e| {
                let other = if e.source() == target {
                    e.target()
                } else {
                    e.source()
                };
                self.graph[other]
            })
            .filter(|node| seen.insert(node.id.as_str()))
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|node| node.id.clone()).collect()
    }

    fn sample() -> Graph {
        let nodes = vec![
            Node::new("service:OrderAPI", NodeType::Service, "OrderAPI"),
            Node::new("service:Reporting", NodeType::Service, "Reporting"),
            Node::new("table:default:orders", NodeType::DbTable, "orders"),
            Node::new("table:default:invoices", NodeType::DbTable, "invoices"),
        ];
        let edges = vec![
            Edge::new("service:OrderAPI", "table:default:orders", EdgeType::Writes, 0.9),
            Edge::new("service:OrderAPI", "table:default:invoices", EdgeType::Reads, 0.8),
            Edge::new("service:Reporting", "table:default:orders", EdgeType::Reads, 0.7),
        ];
        Graph::new(nodes, edges).unwrap()
    }

    #[test]
    fn readers_and_writers_are_split_by_edge_type() {
        let graph = sample();
        let view = DependencyView::new(&graph);
        assert_eq!(ids(&view.writers_of("table:default:orders")), vec!["service:OrderAPI"]);
        assert_eq!(ids(&view.readers_of("table:default:orders")), vec!["service:Reporting"]);
        assert!(view.readers_of("table:default:unknown").is_empty());
    }

    #[test]
    fn tables_of_service_are_sorted() {
        let graph = sample();
        let view = DependencyView::new(&graph);
        assert_eq!(
            ids(&view.tables_of("service:OrderAPI")),
            vec!["table:default:invoices", "table:default:orders"]
        );
    }

    #[test]
    fn outgoing_keeps_insertion_order() {
        let graph = sample();
        let view = DependencyView::new(&graph);
        let targets: Vec<&str> = view
            .outgoing("service:OrderAPI")
            .iter()
            .map(|edge| edge.to_id.as_str())
            .collect();
        assert_eq!(targets, vec!["table:default:orders", "table:default:invoices"]);
    }

    #[test]
    fn neighbors_within_walks_both_directions() {
        let graph = sample();
        let view = DependencyView::new(&graph);
        let found: Vec<(String, usize)> = view
            .neighbors_within("service:Reporting", 2)
            .into_iter()
            .map(|(node, depth)| (node.id.clone(), depth))
            .collect();
        assert_eq!(
            found,
            vec![
                ("table:default:orders".to_string(), 1),
                ("service:OrderAPI".to_string(), 2),
            ]
        );
    }
}
