// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Trade Propagation
//
// One round moves every node's balance along its outgoing weights:
// b' = Mᵗ · b. The matrix is read-only here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::graph::Graph;
use crate::ledger::{Metadata, TransferRecorder};
use crate::matrix::TransitionMatrix;

/// Method tag attached to every ledger entry written by a trade round.
pub const TRADE_METHOD: &str = "trade";

/// What a single round did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RoundOutcome {
    pub round: u64,
    pub total_before: f64,
    pub total_after: f64,
    pub transfers_recorded: usize,
    pub ledger_failures: usize,
}

impl RoundOutcome {
    /// Absolute change in total supply over the round.
    pub fn drift(&self) -> f64 {
        (self.total_after - self.total_before).abs()
    }
}

/// `Mᵗ · b` without touching the graph.
pub fn propagate(matrix: &TransitionMatrix, balances: &[f64]) -> Vec<f64> {
    matrix.apply_transpose(balances)
}

/// Run one trade round against `graph`.
///
/// Balances are replaced by `Mᵗ · b` and each node's delta is appended to its
/// loss history. When a recorder is attached, every non-zero off-diagonal
/// flow `M[i][j] · b[i]` (pre-round balance) is reported to it. Recorder
/// failures are logged and counted, never returned.
pub fn trade_round(
    graph: &mut Graph,
    matrix: &TransitionMatrix,
    iteration: u64,
    recorder: Option<&mut dyn TransferRecorder>,
) -> RoundOutcome {
    let before = graph.balances();
    let after = propagate(matrix, &before);

    let mut transfers_recorded = 0;
    let mut ledger_failures = 0;
    if let Some(recorder) = recorder {
        let ids = graph.node_ordering();
        for (i, &bi) in before.iter().enumerate() {
            for (j, &w) in matrix.row(i).iter().enumerate() {
                let amount = w * bi;
                if i == j || amount == 0.0 {
                    continue;
                }
                let mut meta = Metadata::new();
                meta.insert("weight".into(), Value::from(w));
                match recorder.record_transfer(iteration, &ids[i], &ids[j], amount, TRADE_METHOD, meta) {
                    Ok(_) => transfers_recorded += 1,
                    Err(e) => {
                        ledger_failures += 1;
                        warn!(round = iteration, from = %ids[i], to = %ids[j], error = %e, "ledger write failed");
                    }
                }
            }
        }
    }

    for (node, (&old, &new)) in graph.nodes_mut().iter_mut().zip(before.iter().zip(after.iter())) {
        node.loss_history.push(new - old);
        node.balance = new;
    }

    RoundOutcome {
        round: iteration,
        total_before: before.iter().sum(),
        total_after: after.iter().sum(),
        transfers_recorded,
        ledger_failures,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::Ledger;
    use crate::types::{Edge, GraphKind, Node, NodeId};

    fn triangle(balances: [f64; 3]) -> (Graph, TransitionMatrix) {
        let nodes = ["AA", "AB", "AC"]
            .iter()
            .zip(balances)
            .map(|(id, b)| Node::new(NodeId::from(*id), b))
            .collect();
        let edges = vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 0)];
        let graph = Graph::new(GraphKind::Circulant, false, nodes, edges);
        let matrix = TransitionMatrix::from_rows(vec![
            vec![0.0, 0.5, 0.5],
            vec![0.5, 0.0, 0.5],
            vec![0.5, 0.5, 0.0],
        ])
        .unwrap();
        (graph, matrix)
    }

    struct Broken;

    impl TransferRecorder for Broken {
        fn record_transfer(
            &mut self,
            _iteration: u64,
            _from: &NodeId,
            _to: &NodeId,
            amount: f64,
            _method: &str,
            _metadata: Metadata,
        ) -> Result<String, LedgerError> {
            Err(LedgerError::InvalidAmount(amount))
        }
    }

    #[test]
    fn test_three_node_round() {
        let (mut g, m) = triangle([100.0, 200.0, 300.0]);
        let outcome = trade_round(&mut g, &m, 0, None);
        assert_eq!(g.balances(), vec![250.0, 200.0, 150.0]);
        assert_eq!(g.node(0).unwrap().loss_history, vec![150.0]);
        assert_eq!(g.node(1).unwrap().loss_history, vec![0.0]);
        assert_eq!(g.node(2).unwrap().loss_history, vec![-150.0]);
        assert!(outcome.drift() < 1e-9);
        assert_eq!(outcome.transfers_recorded, 0);
    }

    #[test]
    fn test_original_balance_untouched() {
        let (mut g, m) = triangle([100.0, 200.0, 300.0]);
        trade_round(&mut g, &m, 0, None);
        trade_round(&mut g, &m, 1, None);
        assert_eq!(g.node(2).unwrap().original_balance, 300.0);
        assert_eq!(g.node(2).unwrap().loss_history.len(), 2);
    }

    #[test]
    fn test_ledger_gets_every_offdiagonal_flow() {
        let (mut g, m) = triangle([100.0, 200.0, 300.0]);
        let mut ledger = Ledger::new();
        let outcome = trade_round(&mut g, &m, 7, Some(&mut ledger));
        assert_eq!(outcome.transfers_recorded, 6);
        assert_eq!(ledger.len(), 6);
        assert!(ledger.entries().iter().all(|e| e.iteration == 7 && e.method == TRADE_METHOD));
        assert!((ledger.summary_by_iteration()[&7] - 600.0).abs() < 1e-9);
        let aa_to_ab = ledger.query(|e| e.from.as_str() == "AA" && e.to.as_str() == "AB");
        assert_eq!(aa_to_ab.len(), 1);
        assert_eq!(aa_to_ab[0].amount, 50.0);
        assert_eq!(aa_to_ab[0].metadata["weight"], Value::from(0.5));
    }

    #[test]
    fn test_self_retention_and_zero_flows_not_recorded() {
        let (mut g, _) = triangle([100.0, 0.0, 300.0]);
        let m = TransitionMatrix::from_rows(vec![
            vec![0.5, 0.5, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let mut ledger = Ledger::new();
        trade_round(&mut g, &m, 0, Some(&mut ledger));
        // only AA -> AB carries mass off the diagonal
        assert_eq!(ledger.len(), 1);
        assert_eq!(g.balances(), vec![50.0, 50.0, 300.0]);
    }

    #[test]
    fn test_recorder_failures_do_not_abort_round() {
        let (mut g, m) = triangle([100.0, 200.0, 300.0]);
        let mut broken = Broken;
        let outcome = trade_round(&mut g, &m, 0, Some(&mut broken));
        assert_eq!(outcome.ledger_failures, 6);
        assert_eq!(g.balances(), vec![250.0, 200.0, 150.0]);
    }
}
