// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Adaptive Feedback (Stingy Behaviour)
//
// A node whose recent losses average past a threshold starts hoarding: it
// gains a self-loop, so the next matrix build keeps part of its balance home.
// Nodes are scanned in fixed order and the scan stops as soon as the run-wide
// cap is reached, so earlier nodes win ties for the remaining slots.

use tracing::info;

use crate::config::StingyConfig;
use crate::graph::Graph;

/// Evaluate every node once. Returns the indices of the nodes that became
/// stingy; the caller must rebuild the transition matrix when non-empty.
pub fn apply_stingy(graph: &mut Graph, config: &StingyConfig) -> Vec<usize> {
    let mut turned = Vec::new();
    if !config.enabled {
        return turned;
    }

    for i in 0..graph.len() {
        if config.max_behaviors.map_or(false, |max| graph.stingy_count() >= max) {
            break;
        }
        let Some(avg) = average_loss(graph, i, config.window) else {
            continue;
        };
        if avg <= -config.avg_loss_pct && !graph.has_self_loop(i) {
            graph.add_edge(i, i);
            graph.increment_stingy();
            turned.push(i);
            if let Some(node) = graph.node(i) {
                info!(
                    node = %node.id,
                    avg_loss = avg,
                    stingy_count = graph.stingy_count(),
                    "node turned stingy"
                );
            }
        }
    }
    turned
}

/// Mean of the last `window` deltas as a fraction of the original balance.
/// `None` until the history is long enough, or when the node started empty.
pub fn average_loss(graph: &Graph, index: usize, window: usize) -> Option<f64> {
    let node = graph.node(index)?;
    if window == 0 || node.loss_history.len() < window || node.original_balance == 0.0 {
        return None;
    }
    let recent = &node.loss_history[node.loss_history.len() - window..];
    let mean = recent.iter().sum::<f64>() / window as f64;
    Some(mean / node.original_balance)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
