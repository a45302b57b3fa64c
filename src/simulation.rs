// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Simulation Core

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;

use crate::config::SimConfig;
use crate::error::Result;
use crate::graph::Graph;
use crate::ledger::{Ledger, TransferRecorder};
use crate::matrix::{TransitionMatrix, Weighting};
use crate::snapshot::{History, Snapshot};
use crate::spectral::{self, ConvergenceReport};
use crate::stingy::apply_stingy;
use crate::topology::generate_graph;
use crate::trade::{trade_round, RoundOutcome};
use crate::types::NodeId;

/// Supply drift per round beyond which a warning is logged.
const CONSERVATION_TOLERANCE: f64 = 1e-6;

// ─── TokenSimulation struct ─────────────────────────────────────────────────

/// One simulation run. Owns its graph, matrix, history, ledger and RNG, so
/// independent runs never share state.
#[wasm_bindgen]
pub struct TokenSimulation {
    pub(crate) config: SimConfig,
    pub(crate) graph: Graph,
    pub(crate) matrix: TransitionMatrix,
    pub(crate) history: History,
    pub(crate) ledger: Option<Ledger>,
    pub(crate) rng: ChaCha8Rng,
    /// Rounds completed so far.
    pub(crate) round: u64,
}

/// Everything a finished run hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub history: History,
    pub node_ordering: Vec<NodeId>,
    pub final_matrix: TransitionMatrix,
    pub stingy_count: usize,
    pub convergence: ConvergenceReport,
    pub ledger: Option<Ledger>,
}

// ─── Internal Logic (Testable, pure Rust) ───────────────────────────────────

impl TokenSimulation {
    /// Validate `config`, generate the graph and build the first matrix.
    /// Nothing is created when the configuration is rejected.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = if config.control_random_seed {
            ChaCha8Rng::seed_from_u64(config.seed)
        } else {
            ChaCha8Rng::from_entropy()
        };

        let mut graph = generate_graph(&config, &mut rng)?;
        let matrix = build_matrix(&graph, config.randomize_weights, &mut rng)?;
        graph.assign_weights(&matrix);

        let history = vec![Snapshot::capture(0, &graph)];
        let ledger = config.record_ledger.then(Ledger::new);

        info!(
            kind = %graph.kind(),
            nodes = graph.len(),
            seeded = config.control_random_seed,
            "simulation initialised"
        );
        Ok(Self { config, graph, matrix, history, ledger, rng, round: 0 })
    }

    /// Trade, then let nodes react, then rebuild the matrix if the topology
    /// changed. Appends one snapshot.
    pub fn step(&mut self) -> Result<RoundOutcome> {
        let iteration = self.round;
        let recorder = self.ledger.as_mut().map(|l| l as &mut dyn TransferRecorder);
        let outcome = trade_round(&mut self.graph, &self.matrix, iteration, recorder);
        if outcome.drift() > CONSERVATION_TOLERANCE {
            warn!(round = iteration, drift = outcome.drift(), "token supply drifted");
        }

        let turned = apply_stingy(&mut self.graph, &self.config.stingy);
        if !turned.is_empty() {
            self.matrix = build_matrix(&self.graph, self.config.randomize_weights, &mut self.rng)?;
            self.graph.assign_weights(&self.matrix);
        }

        self.round += 1;
        let snapshot = Snapshot::capture(self.round, &self.graph);
        if self.config.log_percent_change {
            if let Some(previous) = self.history.last() {
                debug!(round = self.round, changes = ?snapshot.percent_changes(previous), "percent change");
            }
        }
        debug!(
            round = self.round,
            total = outcome.total_after,
            stingy_count = self.graph.stingy_count(),
            rebuilt = !turned.is_empty(),
            "round complete"
        );
        self.history.push(snapshot);
        Ok(outcome)
    }

    /// Run `iterations` rounds.
    pub fn run(&mut self, iterations: usize) -> Result<Vec<RoundOutcome>> {
        let mut outcomes = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            outcomes.push(self.step()?);
        }
        info!(
            rounds = self.round,
            stingy_count = self.graph.stingy_count(),
            ledger_entries = self.ledger.as_ref().map_or(0, Ledger::len),
            "run finished"
        );
        Ok(outcomes)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    pub fn node_ordering(&self) -> Vec<NodeId> {
        self.graph.node_ordering()
    }

    pub fn stingy_count(&self) -> usize {
        self.graph.stingy_count()
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Spectral diagnostics for the current matrix and balances.
    pub fn convergence(&self) -> ConvergenceReport {
        spectral::analyze(&self.matrix, &self.graph.balances())
    }

    pub fn into_output(self) -> RunOutput {
        let convergence = self.convergence();
        RunOutput {
            node_ordering: self.graph.node_ordering(),
            stingy_count: self.graph.stingy_count(),
            history: self.history,
            final_matrix: self.matrix,
            convergence,
            ledger: self.ledger,
        }
    }
}

/// Build a fresh simulation from `config`, run it and collect the results.
pub fn run(iterations: usize, config: &SimConfig) -> Result<RunOutput> {
    let mut sim = TokenSimulation::new(config.clone())?;
    sim.run(iterations)?;
    Ok(sim.into_output())
}

fn build_matrix(graph: &Graph, randomize: bool, rng: &mut ChaCha8Rng) -> Result<TransitionMatrix> {
    let neighbors = graph.out_neighbors();
    if randomize {
        TransitionMatrix::build(&neighbors, &mut Weighting::Random(rng))
    } else {
        TransitionMatrix::build::<ChaCha8Rng>(&neighbors, &mut Weighting::Uniform)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdjacencyRow, ModelConfig, StingyConfig};
    use crate::matrix::ROW_TOLERANCE;
    use crate::types::Edge;

    fn custom(adjacency: &[(&str, &[&str])], balances: Vec<f64>) -> SimConfig {
        let adjacency = adjacency
            .iter()
            .map(|(node, targets)| AdjacencyRow {
                node: node.to_string(),
                targets: targets.iter().map(|t| t.to_string()).collect(),
            })
            .collect::<Vec<_>>();
        SimConfig::with_model(adjacency.len(), ModelConfig::Custom { adjacency, balances }).seeded(1)
    }

    #[test]
    fn test_new_builds_stochastic_matrix_and_initial_snapshot() {
        let sim = TokenSimulation::new(SimConfig::default().seeded(3)).unwrap();
        assert!(sim.matrix().is_row_stochastic(ROW_TOLERANCE));
        assert_eq!(sim.history().len(), 1);
        assert_eq!(sim.history()[0].round, 0);
        assert!(sim.ledger().is_none());
        assert_eq!(sim.round(), 0);
    }

    #[test]
    fn test_edge_weights_follow_matrix() {
        let sim = TokenSimulation::new(SimConfig::with_model(12, ModelConfig::small_world()).seeded(4)).unwrap();
        for e in sim.graph().edges() {
            assert_eq!(e.weight, sim.matrix().get(e.source, e.target));
        }
    }

    #[test]
    fn test_rejected_config_creates_nothing() {
        let err = TokenSimulation::new(SimConfig::with_model(1, ModelConfig::default())).err();
        assert!(err.map_or(false, |e| e.is_config_error()));
    }

    #[test]
    fn test_step_conserves_and_records_history() {
        let mut sim = TokenSimulation::new(SimConfig::default().seeded(9)).unwrap();
        let total = sim.graph().total_balance();
        for _ in 0..5 {
            let outcome = sim.step().unwrap();
            assert!(outcome.drift() < 1e-6);
        }
        assert_eq!(sim.history().len(), 6);
        assert!((sim.graph().total_balance() - total).abs() < 1e-6);
        assert_eq!(sim.history().last().unwrap().round, 5);
    }

    #[test]
    fn test_stingy_rebuilds_matrix() {
        // AA gives everything to AB, AB keeps what it gets.
        let mut config = custom(&[("a", &["b"]), ("b", &[])], vec![100.0, 0.0]);
        config.stingy = StingyConfig { window: 1, ..StingyConfig::default() };
        let mut sim = TokenSimulation::new(config).unwrap();
        assert_eq!(sim.matrix().get(0, 1), 1.0);

        sim.step().unwrap();
        assert_eq!(sim.stingy_count(), 1);
        assert!(sim.graph().has_self_loop(0));
        assert_eq!(sim.matrix().get(0, 0), 0.5);
        assert_eq!(sim.matrix().get(0, 1), 0.5);
        assert!(sim.graph().edges().contains(&Edge { source: 0, target: 0, weight: 0.5 }));
        assert!(!sim.history()[0].shares_topology_with(&sim.history()[1]));
    }

    #[test]
    fn test_ledger_attached_when_requested() {
        let mut config = SimConfig::with_model(6, ModelConfig::circulant()).seeded(2);
        config.record_ledger = true;
        let mut sim = TokenSimulation::new(config).unwrap();
        sim.run(3).unwrap();
        let ledger = sim.ledger().unwrap();
        assert!(!ledger.is_empty());
        assert_eq!(ledger.summary_by_iteration().len(), 3);
    }

    #[test]
    fn test_run_output() {
        let output = run(4, &SimConfig::with_model(9, ModelConfig::Lattice { columns: None }).seeded(8)).unwrap();
        assert_eq!(output.history.len(), 5);
        assert_eq!(output.node_ordering.len(), 9);
        assert_eq!(output.final_matrix.size(), 9);
        assert_eq!(output.convergence.eigenvector.len(), 9);
    }
}
