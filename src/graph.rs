// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Graph Aggregate

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::matrix::TransitionMatrix;
use crate::types::{Edge, GraphKind, Node, NodeId};

// ─── Topology ───────────────────────────────────────────────────────────────

/// Node identifiers plus the edge list. Shared between the live graph and
/// the snapshots taken while it stays unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topology {
    pub node_ids: Vec<NodeId>,
    pub edges: Vec<Edge>,
    pub directed: bool,
}

impl Topology {
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Undirected graphs match the pair in either orientation.
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.edges.iter().any(|e| {
            (e.source == u && e.target == v)
                || (!self.directed && e.source == v && e.target == u)
        })
    }

    pub fn has_self_loop(&self, node: usize) -> bool {
        self.edges.iter().any(|e| e.source == node && e.target == node)
    }

    /// Out-neighbour sets per node. Parallel edges collapse; undirected
    /// edges count in both directions.
    pub fn out_neighbors(&self) -> Vec<BTreeSet<usize>> {
        let mut neighbors = vec![BTreeSet::new(); self.node_ids.len()];
        for e in &self.edges {
            neighbors[e.source].insert(e.target);
            if !self.directed {
                neighbors[e.target].insert(e.source);
            }
        }
        neighbors
    }

    /// Directed view for connectivity analysis. Node `i` sits at
    /// `NodeIndex::new(i)` and carries `i` as its weight; undirected edges
    /// become a pair of arcs.
    pub fn digraph(&self) -> DiGraph<usize, ()> {
        let mut g = DiGraph::with_capacity(self.node_ids.len(), self.edges.len());
        for i in 0..self.node_ids.len() {
            g.add_node(i);
        }
        for e in &self.edges {
            g.update_edge(NodeIndex::new(e.source), NodeIndex::new(e.target), ());
            if !self.directed {
                g.update_edge(NodeIndex::new(e.target), NodeIndex::new(e.source), ());
            }
        }
        g
    }
}

// ─── Graph ──────────────────────────────────────────────────────────────────

/// Single-owner aggregate: node state, shared topology and the stingy counter.
///
/// Node order is the fixed ordering every matrix and balance vector uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub(crate) kind: GraphKind,
    pub(crate) nodes: Vec<Node>,
    pub(crate) topology: Arc<Topology>,
    pub(crate) stingy_count: usize,
}

impl Graph {
    pub fn new(kind: GraphKind, directed: bool, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let node_ids = nodes.iter().map(|n| n.id.clone()).collect();
        Self {
            kind,
            nodes,
            topology: Arc::new(Topology { node_ids, edges, directed }),
            stingy_count: 0,
        }
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn is_directed(&self) -> bool {
        self.topology.directed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    pub fn node_ordering(&self) -> Vec<NodeId> {
        self.topology.node_ids.clone()
    }

    pub fn balances(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.balance).collect()
    }

    pub fn total_balance(&self) -> f64 {
        self.nodes.iter().map(|n| n.balance).sum()
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn edges(&self) -> &[Edge] {
        &self.topology.edges
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.topology.has_edge(u, v)
    }

    pub fn has_self_loop(&self, node: usize) -> bool {
        self.topology.has_self_loop(node)
    }

    pub fn out_neighbors(&self) -> Vec<BTreeSet<usize>> {
        self.topology.out_neighbors()
    }

    pub fn digraph(&self) -> DiGraph<usize, ()> {
        self.topology.digraph()
    }

    pub fn stingy_count(&self) -> usize {
        self.stingy_count
    }

    pub(crate) fn increment_stingy(&mut self) {
        self.stingy_count += 1;
    }

    /// Append an edge. Snapshots holding the old topology keep it.
    pub fn add_edge(&mut self, source: usize, target: usize) {
        Arc::make_mut(&mut self.topology).edges.push(Edge::new(source, target));
    }

    /// Copy `M[source][target]` onto every edge.
    pub fn assign_weights(&mut self, matrix: &TransitionMatrix) {
        let changed = self
            .topology
            .edges
            .iter()
            .any(|e| e.weight != matrix.get(e.source, e.target));
        if !changed {
            return;
        }
        for e in Arc::make_mut(&mut self.topology).edges.iter_mut() {
            e.weight = matrix.get(e.source, e.target);
        }
    }

    /// Replace every identifier with the code at the same position.
    pub fn relabel(&mut self, codes: Vec<NodeId>) {
        debug_assert_eq!(codes.len(), self.nodes.len());
        for (node, code) in self.nodes.iter_mut().zip(codes.iter()) {
            node.id = code.clone();
        }
        Arc::make_mut(&mut self.topology).node_ids = codes;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(directed: bool) -> Graph {
        let nodes = (0..3).map(|i| Node::new(NodeId(i.to_string()), 10.0)).collect();
        let edges = vec![Edge::new(0, 1), Edge::new(1, 2)];
        Graph::new(GraphKind::Custom, directed, nodes, edges)
    }

    #[test]
    fn test_directed_neighbors_follow_orientation() {
        let g = path_graph(true);
        let nb = g.out_neighbors();
        assert_eq!(nb[0].iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(nb[1].iter().copied().collect::<Vec<_>>(), vec![2]);
        assert!(nb[2].is_empty());
        assert!(g.has_edge(0, 1));
        assert!(!g.has_edge(1, 0));
    }

    #[test]
    fn test_undirected_neighbors_are_symmetric() {
        let g = path_graph(false);
        let nb = g.out_neighbors();
        assert_eq!(nb[1].iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(g.has_edge(1, 0));
    }

    #[test]
    fn test_parallel_edges_collapse() {
        let mut g = path_graph(true);
        g.add_edge(0, 1);
        assert_eq!(g.edges().len(), 3);
        assert_eq!(g.out_neighbors()[0].len(), 1);
    }

    #[test]
    fn test_digraph_mirrors_undirected_edges() {
        let directed = path_graph(true).digraph();
        assert_eq!((directed.node_count(), directed.edge_count()), (3, 2));
        let mut g = path_graph(false);
        g.add_edge(0, 1);
        let undirected = g.digraph();
        assert_eq!(undirected.edge_count(), 4);
        assert!(undirected.contains_edge(NodeIndex::new(2), NodeIndex::new(1)));
        assert_eq!(undirected[NodeIndex::new(2)], 2);
    }

    #[test]
    fn test_add_edge_copies_shared_topology() {
        let mut g = path_graph(true);
        let before = Arc::clone(g.topology());
        g.add_edge(2, 2);
        assert!(g.has_self_loop(2));
        assert!(!before.has_self_loop(2));
        assert_eq!(before.edges.len(), 2);
    }

    #[test]
    fn test_relabel_updates_nodes_and_topology() {
        let mut g = path_graph(true);
        g.relabel(vec!["AA".into(), "AB".into(), "AC".into()]);
        assert_eq!(g.node(2).unwrap().id.as_str(), "AC");
        assert_eq!(g.node_ordering()[0].as_str(), "AA");
        assert_eq!(g.index_of(&"AB".into()), Some(1));
    }
}
