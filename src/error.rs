// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Error Types

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, SimError>;

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Errors raised by graph generation, configuration and the simulation driver.
///
/// Configuration variants are raised before any simulation state exists.
/// The remaining variants are internal invariants that validated
/// configuration should not reach.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("node count must be at least 2, got {0}")]
    InvalidNodeCount(usize),

    #[error("node count {count} exceeds the {max} available two-letter codes")]
    TooManyNodes { count: usize, max: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("malformed custom adjacency: {0}")]
    MalformedAdjacency(String),

    #[error("expected {expected} balances, got {got}")]
    BalanceMismatch { expected: usize, got: usize },

    #[error("connectivity repair gave up after {rounds} rounds with {components} components left")]
    RepairExhausted { rounds: usize, components: usize },

    #[error("cannot split 100 weight units across {degree} neighbours")]
    WeightPartition { degree: usize },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to parse JSON configuration: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter { name, reason: reason.into() }
    }

    /// Whether this error stems from invalid configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimError::InvalidNodeCount(_)
                | SimError::TooManyNodes { .. }
                | SimError::InvalidParameter { .. }
                | SimError::MalformedAdjacency(_)
                | SimError::BalanceMismatch { .. }
                | SimError::ConfigParse(_)
                | SimError::ConfigJson(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Ledger errors
// ---------------------------------------------------------------------------

/// Errors from recording a transfer. Trade propagation swallows these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("transfer amount must be finite and positive, got {0}")]
    InvalidAmount(f64),
}
