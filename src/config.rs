// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SimError};
use crate::matrix::WEIGHT_UNITS;
use crate::topology::MAX_NODES;

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Everything a simulation run needs. Built once, validated once, and passed
/// by reference into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default = "default_node_count")]
    pub node_count: usize,

    /// Generative model and its parameters.
    #[serde(default)]
    pub model: ModelConfig,

    /// Split each node's outflow by random integer composition instead of
    /// uniformly. Every share is at least one of [`WEIGHT_UNITS`] units, so
    /// this needs `node_count <= WEIGHT_UNITS`: a node linked to every other
    /// node plus a stingy self-loop has `node_count` out-neighbours.
    #[serde(default)]
    pub randomize_weights: bool,

    /// Seed the RNG from `seed`; otherwise draw from OS entropy.
    #[serde(default)]
    pub control_random_seed: bool,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Range for uniformly assigned starting balances (inclusive).
    #[serde(default)]
    pub initial_balance: BalanceRange,

    #[serde(default)]
    pub stingy: StingyConfig,

    /// Upper bound on connectivity repair rounds.
    #[serde(default = "default_repair_round_cap")]
    pub repair_round_cap: usize,

    /// Attach a transaction ledger to trade propagation.
    #[serde(default)]
    pub record_ledger: bool,

    /// Emit per-round percent change at debug level.
    #[serde(default)]
    pub log_percent_change: bool,
}

fn default_node_count() -> usize {
    10
}

fn default_seed() -> u64 {
    42
}

fn default_repair_round_cap() -> usize {
    64
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            model: ModelConfig::default(),
            randomize_weights: false,
            control_random_seed: false,
            seed: default_seed(),
            initial_balance: BalanceRange::default(),
            stingy: StingyConfig::default(),
            repair_round_cap: default_repair_round_cap(),
            record_ledger: false,
            log_percent_change: false,
        }
    }
}

impl SimConfig {
    /// Config for the given model with every other option at its default.
    pub fn with_model(node_count: usize, model: ModelConfig) -> Self {
        Self { node_count, model, ..Self::default() }
    }

    /// Same config with seeding switched on.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.control_random_seed = true;
        self.seed = seed;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject anything that would make generation or the run ill-defined.
    pub fn validate(&self) -> Result<()> {
        if self.node_count < 2 {
            return Err(SimError::InvalidNodeCount(self.node_count));
        }
        if self.node_count > MAX_NODES {
            return Err(SimError::TooManyNodes { count: self.node_count, max: MAX_NODES });
        }
        if self.initial_balance.low > self.initial_balance.high {
            return Err(SimError::invalid(
                "initial_balance",
                format!("low {} exceeds high {}", self.initial_balance.low, self.initial_balance.high),
            ));
        }
        if self.randomize_weights && self.node_count > WEIGHT_UNITS {
            return Err(SimError::invalid(
                "randomize_weights",
                format!("supports at most {} nodes, got {}", WEIGHT_UNITS, self.node_count),
            ));
        }
        if self.repair_round_cap == 0 {
            return Err(SimError::invalid("repair_round_cap", "must be at least 1"));
        }
        self.stingy.validate()?;
        self.model.validate(self.node_count)
    }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceRange {
    pub low: u32,
    pub high: u32,
}

impl Default for BalanceRange {
    fn default() -> Self {
        Self { low: 10, high: 100 }
    }
}

// ---------------------------------------------------------------------------
// Stingy behaviour
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StingyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cap on self-loops added over a whole run. `None` (the default, and
    /// what an omitted TOML key gives) is unbounded.
    #[serde(default = "default_max_behaviors")]
    pub max_behaviors: Option<usize>,

    /// Average loss fraction (of original balance) that triggers hoarding.
    #[serde(default = "default_avg_loss_pct")]
    pub avg_loss_pct: f64,

    /// Rolling window over the loss history, in rounds.
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_behaviors() -> Option<usize> {
    None
}

fn default_avg_loss_pct() -> f64 {
    0.1
}

fn default_window() -> usize {
    4
}

impl Default for StingyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_behaviors: default_max_behaviors(),
            avg_loss_pct: default_avg_loss_pct(),
            window: default_window(),
        }
    }
}

impl StingyConfig {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(SimError::invalid("stingy.window", "must be at least 1"));
        }
        if !self.avg_loss_pct.is_finite() || self.avg_loss_pct < 0.0 {
            return Err(SimError::invalid(
                "stingy.avg_loss_pct",
                format!("must be a non-negative fraction, got {}", self.avg_loss_pct),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generative models
// ---------------------------------------------------------------------------

/// One row of a custom adjacency list: `node` routes to each of `targets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjacencyRow {
    pub node: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Generative model with its parameters. Generation lives in
/// [`crate::topology::models`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    RandomEdge {
        #[serde(default = "default_edge_probability")]
        edge_probability: f64,
    },
    SmallWorld {
        #[serde(default = "default_small_world_k")]
        k: usize,
        #[serde(default = "default_rewire_probability")]
        rewire_probability: f64,
    },
    PreferentialAttachment {
        #[serde(default = "default_attachment_m")]
        m: usize,
    },
    Circulant {
        #[serde(default = "default_offsets")]
        offsets: Vec<usize>,
    },
    Lattice {
        #[serde(default)]
        columns: Option<usize>,
    },
    Barbell {
        #[serde(default)]
        bell_size: Option<usize>,
    },
    StochasticBlock {
        #[serde(default = "default_blocks")]
        blocks: usize,
        #[serde(default = "default_intra_probability")]
        intra_probability: [f64; 2],
        #[serde(default = "default_inter_probability")]
        inter_probability: [f64; 2],
        #[serde(default = "default_block_means")]
        block_means: Vec<f64>,
        #[serde(default = "default_std_dev")]
        std_dev: f64,
    },
    Custom {
        adjacency: Vec<AdjacencyRow>,
        balances: Vec<f64>,
    },
    RandomRegular {
        #[serde(default = "default_degree")]
        degree: usize,
    },
    RandomMultiDirected {
        #[serde(default)]
        edge_count: Option<usize>,
    },
}

fn default_edge_probability() -> f64 {
    0.3
}

fn default_small_world_k() -> usize {
    2
}

fn default_rewire_probability() -> f64 {
    0.5
}

fn default_attachment_m() -> usize {
    2
}

fn default_offsets() -> Vec<usize> {
    vec![1, 3]
}

fn default_blocks() -> usize {
    4
}

fn default_intra_probability() -> [f64; 2] {
    [0.4, 0.7]
}

fn default_inter_probability() -> [f64; 2] {
    [0.01, 0.2]
}

fn default_block_means() -> Vec<f64> {
    vec![100.0, 80.0, 60.0, 40.0, 20.0]
}

fn default_std_dev() -> f64 {
    15.0
}

fn default_degree() -> usize {
    3
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::RandomMultiDirected { edge_count: None }
    }
}

impl ModelConfig {
    pub fn random_edge() -> Self {
        Self::RandomEdge { edge_probability: default_edge_probability() }
    }

    pub fn small_world() -> Self {
        Self::SmallWorld { k: default_small_world_k(), rewire_probability: default_rewire_probability() }
    }

    pub fn preferential_attachment() -> Self {
        Self::PreferentialAttachment { m: default_attachment_m() }
    }

    pub fn circulant() -> Self {
        Self::Circulant { offsets: default_offsets() }
    }

    pub fn stochastic_block() -> Self {
        Self::StochasticBlock {
            blocks: default_blocks(),
            intra_probability: default_intra_probability(),
            inter_probability: default_inter_probability(),
            block_means: default_block_means(),
            std_dev: default_std_dev(),
        }
    }

    pub fn random_regular() -> Self {
        Self::RandomRegular { degree: default_degree() }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parameter_set() {
        let c = SimConfig::default();
        assert_eq!(c.node_count, 10);
        assert_eq!(c.seed, 42);
        assert!(!c.control_random_seed);
        assert!(c.stingy.enabled);
        assert_eq!(c.stingy.max_behaviors, None);
        assert_eq!(c.stingy.window, 4);
        assert!((c.stingy.avg_loss_pct - 0.1).abs() < f64::EPSILON);
        assert_eq!(c.model, ModelConfig::RandomMultiDirected { edge_count: None });
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_parse_toml_with_model_params() {
        let src = r#"
            node_count = 12
            randomize_weights = true
            control_random_seed = true
            seed = 7

            [model]
            kind = "small_world"
            rewire_probability = 0.25

            [stingy]
            max_behaviors = 5
            window = 3
        "#;
        let c = SimConfig::from_toml_str(src).unwrap();
        assert_eq!(c.node_count, 12);
        assert!(c.randomize_weights);
        assert_eq!(c.seed, 7);
        assert_eq!(c.model, ModelConfig::SmallWorld { k: 2, rewire_probability: 0.25 });
        assert_eq!(c.stingy.max_behaviors, Some(5));
        assert_eq!(c.stingy.window, 3);
        assert!((c.stingy.avg_loss_pct - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_custom_adjacency() {
        let src = r#"
            node_count = 3

            [model]
            kind = "custom"
            balances = [1.0, 0.0, 0.0]

            [[model.adjacency]]
            node = "0"
            targets = ["1"]

            [[model.adjacency]]
            node = "1"
            targets = ["0", "2"]

            [[model.adjacency]]
            node = "2"
            targets = ["0"]
        "#;
        let c = SimConfig::from_toml_str(src).unwrap();
        match c.model {
            ModelConfig::Custom { adjacency, balances } => {
                assert_eq!(adjacency.len(), 3);
                assert_eq!(adjacency[1].targets, vec!["0".to_string(), "2".to_string()]);
                assert_eq!(balances, vec![1.0, 0.0, 0.0]);
            }
            other => panic!("unexpected model {:?}", other),
        }
    }

    #[test]
    fn test_node_count_too_small() {
        for n in [0, 1] {
            let c = SimConfig { node_count: n, ..SimConfig::default() };
            assert!(matches!(c.validate(), Err(SimError::InvalidNodeCount(_))));
        }
    }

    #[test]
    fn test_node_count_too_large() {
        let c = SimConfig { node_count: MAX_NODES + 1, ..SimConfig::default() };
        assert!(matches!(c.validate(), Err(SimError::TooManyNodes { .. })));
    }

    #[test]
    fn test_random_weights_limited_to_weight_units() {
        let mut c = SimConfig { node_count: WEIGHT_UNITS + 1, ..SimConfig::default() };
        assert!(c.validate().is_ok());
        c.randomize_weights = true;
        assert!(matches!(
            c.validate(),
            Err(SimError::InvalidParameter { name: "randomize_weights", .. })
        ));
        c.node_count = WEIGHT_UNITS;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_unknown_model_kind_rejected() {
        let src = r#"
            [model]
            kind = "hyperbolic"
        "#;
        let err = SimConfig::from_toml_str(src).unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut c = SimConfig::default();
        c.stingy.window = 0;
        assert!(matches!(c.validate(), Err(SimError::InvalidParameter { name: "stingy.window", .. })));
    }

    #[test]
    fn test_inverted_balance_range_rejected() {
        let c = SimConfig {
            initial_balance: BalanceRange { low: 50, high: 10 },
            ..SimConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_tag() {
        let c = SimConfig::with_model(8, ModelConfig::circulant());
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"kind\":\"circulant\""));
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model, ModelConfig::Circulant { offsets: vec![1, 3] });
    }

    #[test]
    fn test_from_json_str_validates() {
        let c = SimConfig::from_json_str(r#"{"node_count": 6, "model": {"kind": "lattice"}}"#).unwrap();
        assert_eq!(c.model, ModelConfig::Lattice { columns: None });
        assert!(matches!(
            SimConfig::from_json_str(r#"{"node_count": 0}"#),
            Err(SimError::InvalidNodeCount(0))
        ));
        assert!(matches!(SimConfig::from_json_str("{"), Err(SimError::ConfigJson(_))));
    }
}
