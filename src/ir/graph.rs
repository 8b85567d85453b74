//! Workflow-level dependency graph built over petgraph.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

/// One trigger edge: upstream output consumed by the downstream task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub sequence: String,
    pub output: String,
    pub suicide: bool,
}

/// Task-level dependency graph with a name -> index map for O(1) lookups.
#[derive(Debug, Default)]
pub struct DepGraph {
    pub graph: DiGraph<String, DepEdge>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl DepGraph {
    pub fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_indices.insert(name.to_string(), idx);
        idx
    }

    pub fn add_edge(&mut self, upstream: &str, downstream: &str, edge: DepEdge) {
        let from = self.ensure_node(upstream);
        let to = self.ensure_node(downstream);
        // One edge per (pair, sequence, output, suicide) combination.
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|e| *e.weight() == edge);
        if !exists {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    pub fn incoming_count(&self, name: &str) -> usize {
        let Some(&idx) = self.node_indices.get(name) else {
            return 0;
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .count()
    }

    /// Downstream task names with the connecting edges.
    pub fn downstream_of(&self, name: &str) -> Vec<(&str, &DepEdge)> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (self.graph[e.target()].as_str(), e.weight()))
            .collect()
    }

    pub fn upstream_of(&self, name: &str) -> Vec<(&str, &DepEdge)> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (self.graph[e.source()].as_str(), e.weight()))
            .collect()
    }
}
