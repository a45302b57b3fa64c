// Token Flow Report Types
// Structured output for the `run` and `sweep` sub-commands

use serde::Serialize;
use tokenflow_engine::{ConvergenceReport, GraphKind, NodeId, RunOutput};

// ─── Statistics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Self {
            mean,
            std_dev: variance.sqrt(),
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }
}

// ─── Single Run ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct NodeRow {
    pub node: NodeId,
    pub initial: f64,
    pub last: f64,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub kind: GraphKind,
    pub rounds: u64,
    pub total: f64,
    pub stingy_count: usize,
    pub nodes: Vec<NodeRow>,
    pub convergence: ConvergenceReport,
    pub ledger_entries: usize,
}

impl RunSummary {
    pub fn from_output(kind: GraphKind, output: &RunOutput) -> Self {
        let first = output.history.first().map(|s| s.balances.as_slice()).unwrap_or(&[]);
        let last = output.history.last().map(|s| s.balances.as_slice()).unwrap_or(&[]);
        let total: f64 = last.iter().sum();
        let nodes = output
            .node_ordering
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let balance = last.get(i).copied().unwrap_or(0.0);
                NodeRow {
                    node: id.clone(),
                    initial: first.get(i).copied().unwrap_or(0.0),
                    last: balance,
                    share: if total > 0.0 { balance / total } else { 0.0 },
                }
            })
            .collect();
        Self {
            kind,
            rounds: output.history.last().map_or(0, |s| s.round),
            total,
            stingy_count: output.stingy_count,
            nodes,
            convergence: output.convergence.clone(),
            ledger_entries: output.ledger.as_ref().map_or(0, |l| l.len()),
        }
    }

    pub fn print(&self) {
        println!("\n  Token Flow Run ({}, {} rounds)", self.kind, self.rounds);
        println!("  {:<6} {:>12} {:>12} {:>8}", "Node", "Initial", "Final", "Share");
        println!("  {}", "-".repeat(42));
        for row in &self.nodes {
            println!("  {:<6} {:>12.3} {:>12.3} {:>7.2}%", row.node.as_str(), row.initial, row.last, row.share * 100.0);
        }
        println!("  {}", "-".repeat(42));
        println!("  Total: {:.6}  Stingy: {}  Ledger entries: {}", self.total, self.stingy_count, self.ledger_entries);
        println!(
            "  Eigenvalue: {:.6}  Scaling: {:.6}  Rayleigh: {:.6}  Stationary: {}\n",
            self.convergence.eigenvalue,
            self.convergence.scaling_factor,
            self.convergence.rayleigh,
            if self.convergence.is_eigenvector { "yes" } else { "no" },
        );
    }
}

// ─── Stingy Sweep ───────────────────────────────────────────────────────────

/// All trials that ended with the same number of stingy nodes.
#[derive(Debug, Clone, Serialize)]
pub struct StingyGroup {
    pub actual_stingy: usize,
    pub runs: usize,
    /// Every final node balance across the group's runs.
    pub final_balance: Stats,
    /// Largest single-node share of supply per run.
    pub top_share: Stats,
    /// Fraction of runs whose final balances were stationary.
    pub stationary_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub kind: GraphKind,
    pub node_count: usize,
    pub iterations: usize,
    pub trials_per_cap: usize,
    pub caps: Vec<usize>,
    pub groups: Vec<StingyGroup>,
}

impl SweepReport {
    pub fn print(&self) {
        println!("\n  Stingy Sweep ({}, {} nodes, {} rounds, {} trials per cap)",
            self.kind, self.node_count, self.iterations, self.trials_per_cap);
        println!("  {:<8} {:>6} {:>12} {:>10} {:>10} {:>11}",
            "Stingy", "Runs", "Mean bal", "Std dev", "Top share", "Stationary");
        println!("  {}", "-".repeat(62));
        for g in &self.groups {
            println!("  {:<8} {:>6} {:>12.3} {:>10.3} {:>9.2}% {:>10.0}%",
                g.actual_stingy,
                g.runs,
                g.final_balance.mean,
                g.final_balance.std_dev,
                g.top_share.mean * 100.0,
                g.stationary_rate * 100.0,
            );
        }
        println!();
    }
}
