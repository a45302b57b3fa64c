// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Strong Connectivity Repair
//
// Contracts every strongly connected component to a single node, then links
// condensation sinks back to sources and isolated components to each other
// until a single component remains.

use petgraph::algo::{condensation, tarjan_scc};
use petgraph::graph::DiGraph;
use petgraph::Direction::{Incoming, Outgoing};
use tracing::{debug, info};

use crate::error::{Result, SimError};
use crate::graph::Graph;

// ---------------------------------------------------------------------------
// Strongly connected components
// ---------------------------------------------------------------------------

/// Component id per node, plus the number of components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    pub component_of: Vec<usize>,
    pub count: usize,
}

/// Strongly connected components of a topology view built by
/// [`Graph::digraph`]. Ids follow Tarjan's completion order.
pub fn strongly_connected_components(view: &DiGraph<usize, ()>) -> Components {
    let sccs = tarjan_scc(view);
    let mut component_of = vec![0; view.node_count()];
    for (c, members) in sccs.iter().enumerate() {
        for node in members {
            component_of[view[*node]] = c;
        }
    }
    Components { component_of, count: sccs.len() }
}

pub fn is_strongly_connected(view: &DiGraph<usize, ()>) -> bool {
    view.node_count() > 0 && tarjan_scc(view).len() == 1
}

// ---------------------------------------------------------------------------
// Condensation
// ---------------------------------------------------------------------------

/// Condensation DAG classified by degree. Each component is named by its
/// representative, the smallest node index it contains; lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CondensationClasses {
    /// In-degree 0, out-degree > 0.
    pub sources: Vec<usize>,
    /// Out-degree 0, in-degree > 0.
    pub sinks: Vec<usize>,
    /// Both degrees 0.
    pub isolated: Vec<usize>,
}

pub fn classify_condensation(view: &DiGraph<usize, ()>) -> CondensationClasses {
    // self-loops and parallel arcs between components are dropped
    let dag = condensation(view.clone(), true);
    let mut classes = CondensationClasses::default();
    for c in dag.node_indices() {
        let Some(&representative) = dag[c].iter().min() else {
            continue;
        };
        let has_in = dag.neighbors_directed(c, Incoming).next().is_some();
        let has_out = dag.neighbors_directed(c, Outgoing).next().is_some();
        match (has_in, has_out) {
            (false, false) => classes.isolated.push(representative),
            (false, true) => classes.sources.push(representative),
            (true, false) => classes.sinks.push(representative),
            (true, true) => {}
        }
    }
    classes.sources.sort_unstable();
    classes.sinks.sort_unstable();
    classes.isolated.sort_unstable();
    classes
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

/// One repair pass. Returns the edges it added.
///
/// Sinks are linked to sources pairwise (indices wrap), then every isolated
/// component is linked to every other. Distinct components never share a
/// representative, so no self-loop can appear.
pub fn repair_pass(graph: &mut Graph) -> Vec<(usize, usize)> {
    let classes = classify_condensation(&graph.digraph());
    let mut added = Vec::new();

    if !classes.sources.is_empty() && !classes.sinks.is_empty() {
        let pairs = classes.sources.len().max(classes.sinks.len());
        for i in 0..pairs {
            let sink = classes.sinks[i % classes.sinks.len()];
            let source = classes.sources[i % classes.sources.len()];
            link(graph, &mut added, sink, source);
        }
    }

    for &from in &classes.isolated {
        for &to in &classes.isolated {
            link(graph, &mut added, from, to);
        }
    }
    added
}

fn link(graph: &mut Graph, added: &mut Vec<(usize, usize)>, u: usize, v: usize) {
    if u != v && !graph.has_edge(u, v) {
        graph.add_edge(u, v);
        added.push((u, v));
    }
}

/// Repair until the graph is strongly connected, giving up after
/// `round_cap` passes. Returns every edge added.
pub fn make_strongly_connected(graph: &mut Graph, round_cap: usize) -> Result<Vec<(usize, usize)>> {
    let mut added = Vec::new();
    let mut rounds = 0;
    loop {
        let comps = strongly_connected_components(&graph.digraph());
        if comps.count <= 1 {
            break;
        }
        if rounds >= round_cap {
            return Err(SimError::RepairExhausted { rounds, components: comps.count });
        }
        let pass = repair_pass(graph);
        debug!(round = rounds, components = comps.count, added = pass.len(), "connectivity repair pass");
        if pass.is_empty() {
            // nothing left to add yet still disconnected
            return Err(SimError::RepairExhausted { rounds: rounds + 1, components: comps.count });
        }
        added.extend(pass);
        rounds += 1;
    }
    if !added.is_empty() {
        info!(edges = added.len(), rounds, "graph repaired to strong connectivity");
    }
    Ok(added)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
