//! petgraph-based directed graph over a normalised workflow.

use std::collections::HashMap;

use petgraph::Direction as EdgeDirection;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;

use super::normalize::SourceWorkflow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabel {
    pub from_output: u32,
    pub to_input: u32,
    pub kind: String,
}

pub struct WorkflowGraph {
    pub graph: DiGraph<String, EdgeLabel>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl WorkflowGraph {
    /// Only resolved edges are added; unresolved ones are reported elsewhere.
    pub fn build(workflow: &SourceWorkflow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &workflow.nodes {
            let idx = graph.add_node(node.key.clone());
            node_indices.insert(node.key.clone(), idx);
        }

        for edge in &workflow.edges {
            if let (Some(&s), Some(&t)) = (node_indices.get(&edge.from), node_indices.get(&edge.to)) {
                graph.add_edge(
                    s,
                    t,
                    EdgeLabel {
                        from_output: edge.from_output,
                        to_input: edge.to_input,
                        kind: edge.kind.clone(),
                    },
                );
            }
        }

        WorkflowGraph {
            graph,
            node_indices,
        }
    }

    fn edges(&self, key: &str, direction: EdgeDirection) -> Vec<EdgeReference<'_, EdgeLabel>> {
        let Some(&idx) = self.node_indices.get(key) else {
            return vec![];
        };
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        // petgraph walks adjacency lists newest first.
        edges.sort_by_key(|e| e.id());
        edges
    }

    /// Outgoing edges in insertion order.
    pub fn successors(&self, key: &str) -> Vec<(&str, &EdgeLabel)> {
        self.edges(key, EdgeDirection::Outgoing)
            .into_iter()
            .map(|e| (self.graph[e.target()].as_str(), e.weight()))
            .collect()
    }

    /// Incoming edges in insertion order.
    pub fn predecessors(&self, key: &str) -> Vec<(&str, &EdgeLabel)> {
        self.edges(key, EdgeDirection::Incoming)
            .into_iter()
            .map(|e| (self.graph[e.source()].as_str(), e.weight()))
            .collect()
    }

    /// Source of the first incoming edge.
    pub fn first_upstream(&self, key: &str) -> Option<&str> {
        self.predecessors(key).first().map(|(k, _)| *k)
    }

    pub fn incoming_count(&self, key: &str) -> usize {
        self.predecessors(key).len()
    }

    /// Outputs needed to carry every outgoing edge: the highest output index
    /// in use plus one.
    pub fn output_count(&self, key: &str) -> usize {
        self.successors(key)
            .iter()
            .map(|(_, label)| label.from_output as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Nodes without incoming edges, in document order.
    pub fn roots(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, EdgeDirection::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }
}
