// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Type Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── NodeId ─────────────────────────────────────────────────────────────────

/// Node identifier: a two-letter code after relabelling, a raw index before.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { NodeId(s) }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { NodeId(s.to_string()) }
}

// ─── Graph Kind ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    RandomEdge,
    SmallWorld,
    PreferentialAttachment,
    Circulant,
    Lattice,
    Barbell,
    StochasticBlock,
    Custom,
    RandomRegular,
    RandomMultiDirected,
}

impl GraphKind {
    pub fn is_directed(&self) -> bool {
        matches!(self, Self::Custom | Self::RandomMultiDirected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::RandomEdge => "random_edge",
            Self::SmallWorld => "small_world",
            Self::PreferentialAttachment => "preferential_attachment",
            Self::Circulant => "circulant",
            Self::Lattice => "lattice",
            Self::Barbell => "barbell",
            Self::StochasticBlock => "stochastic_block",
            Self::Custom => "custom",
            Self::RandomRegular => "random_regular",
            Self::RandomMultiDirected => "random_multi_directed",
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─── Node ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub balance: f64,
    /// Balance at creation. Never changes afterwards.
    pub original_balance: f64,
    /// Per-round balance delta, oldest first.
    pub loss_history: Vec<f64>,
}

impl Node {
    pub fn new(id: NodeId, balance: f64) -> Self {
        Self {
            id,
            balance,
            original_balance: balance,
            loss_history: Vec::new(),
        }
    }
}

// ─── Edge ───────────────────────────────────────────────────────────────────

/// Directed (or, in undirected graphs, unordered) relationship between two
/// node indices. `source == target` is retained mass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    #[serde(default)]
    pub weight: f64,
}

impl Edge {
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target, weight: 0.0 }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
