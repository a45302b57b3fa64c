// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Topology Generator

pub mod models;
pub mod repair;

pub use models::{BalancePlan, RawTopology};
pub use repair::{is_strongly_connected, make_strongly_connected, strongly_connected_components};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::config::{BalanceRange, SimConfig};
use crate::error::{Result, SimError};
use crate::graph::Graph;
use crate::types::{GraphKind, Node, NodeId};

/// Number of distinct two-letter codes.
pub const MAX_NODES: usize = 26 * 26;

/// `AA`, `AB`, … `ZZ`: the first `n` codes in lexicographic order.
pub fn letter_codes(n: usize) -> Result<Vec<NodeId>> {
    if n > MAX_NODES {
        return Err(SimError::TooManyNodes { count: n, max: MAX_NODES });
    }
    Ok((0..n)
        .map(|i| {
            let first = (b'A' + (i / 26) as u8) as char;
            let second = (b'A' + (i % 26) as u8) as char;
            NodeId(format!("{}{}", first, second))
        })
        .collect())
}

/// Build the starting graph: generate edges, assign balances, repair
/// directed random graphs and relabel to two-letter codes.
///
/// Random multigraphs keep their raw labels through the repair step.
pub fn generate_graph<R: Rng>(config: &SimConfig, rng: &mut R) -> Result<Graph> {
    config.validate()?;
    let n = config.node_count;
    let raw = config.model.generate(n, rng)?;
    let balances = assign_balances(&raw.balances, n, config.initial_balance, rng)?;

    let directed = raw.directed();
    let nodes = raw
        .labels
        .iter()
        .zip(balances)
        .map(|(label, balance)| Node::new(NodeId(label.clone()), balance))
        .collect();
    let mut graph = Graph::new(raw.kind, directed, nodes, raw.edges);

    if raw.kind == GraphKind::RandomMultiDirected {
        make_strongly_connected(&mut graph, config.repair_round_cap)?;
    }
    graph.relabel(letter_codes(n)?);

    debug!(
        kind = %graph.kind(),
        nodes = graph.len(),
        edges = graph.edges().len(),
        total = graph.total_balance(),
        "graph generated"
    );
    Ok(graph)
}

/// Starting balances for `n` nodes according to the model's plan.
pub fn assign_balances<R: Rng>(
    plan: &BalancePlan,
    n: usize,
    range: BalanceRange,
    rng: &mut R,
) -> Result<Vec<f64>> {
    match plan {
        BalancePlan::Uniform => Ok((0..n)
            .map(|_| rng.gen_range(range.low..=range.high) as f64)
            .collect()),
        BalancePlan::PerBlock { block_of, means, std_dev } => {
            let mut out = Vec::with_capacity(n);
            for &block in block_of {
                let mean = means.get(block).copied().ok_or_else(|| {
                    SimError::invalid("block_means", format!("no mean for block {}", block))
                })?;
                let normal = Normal::new(mean, *std_dev)
                    .map_err(|e| SimError::invalid("std_dev", e.to_string()))?;
                // whole tokens, never negative
                out.push(normal.sample(rng).trunc().max(0.0));
            }
            Ok(out)
        }
        BalancePlan::Explicit(values) => {
            if values.len() != n {
                return Err(SimError::BalanceMismatch { expected: n, got: values.len() });
            }
            Ok(values.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
