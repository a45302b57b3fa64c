// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Snapshot History

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::graph::{Graph, Topology};
use crate::types::NodeId;

/// Immutable capture of one round. The topology is shared with the live
/// graph (and with neighbouring snapshots) until the graph's edges change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub round: u64,
    pub topology: Arc<Topology>,
    pub balances: Vec<f64>,
    pub stingy_count: usize,
}

impl Snapshot {
    pub fn capture(round: u64, graph: &Graph) -> Self {
        Self {
            round,
            topology: Arc::clone(graph.topology()),
            balances: graph.balances(),
            stingy_count: graph.stingy_count(),
        }
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.topology.node_ids
    }

    pub fn total_balance(&self) -> f64 {
        self.balances.iter().sum()
    }

    /// Per-node change since `previous`, in percent. `None` where the
    /// previous balance was zero.
    pub fn percent_changes(&self, previous: &Snapshot) -> Vec<Option<f64>> {
        self.balances
            .iter()
            .zip(&previous.balances)
            .map(|(&now, &before)| {
                if before == 0.0 {
                    None
                } else {
                    Some((now - before) / before * 100.0)
                }
            })
            .collect()
    }

    pub fn shares_topology_with(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.topology, &other.topology)
    }
}

/// Round-ordered snapshots; index 0 is the initial state.
pub type History = Vec<Snapshot>;
