// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Transition Matrix Builder

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Result, SimError};

/// Units split across a node's neighbours when weights are randomised.
pub const WEIGHT_UNITS: usize = 100;

/// Row-sum tolerance for a matrix to count as row-stochastic.
pub const ROW_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Weighting
// ---------------------------------------------------------------------------

/// How a node's outflow is split across its out-neighbours.
pub enum Weighting<'a, R: Rng> {
    /// `1 / deg` per neighbour.
    Uniform,
    /// Random integer composition of [`WEIGHT_UNITS`], normalised to `[0, 1]`.
    Random(&'a mut R),
}

// ---------------------------------------------------------------------------
// TransitionMatrix
// ---------------------------------------------------------------------------

/// Dense N×N matrix indexed by the fixed node ordering.
/// `M[i][j]` is the fraction of node i's balance that flows to node j.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionMatrix {
    data: Array2<f64>,
}

impl TransitionMatrix {
    pub fn zeros(size: usize) -> Self {
        Self { data: Array2::zeros((size, size)) }
    }

    /// Build from explicit rows. Fails unless the rows form a square matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let size = rows.len();
        let mut flat = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(SimError::invalid(
                    "matrix",
                    format!("row {} has {} entries, expected {}", i, row.len(), size),
                ));
            }
            flat.extend(row);
        }
        let data = Array2::from_shape_vec((size, size), flat)
            .map_err(|e| SimError::invalid("matrix", e.to_string()))?;
        Ok(Self { data })
    }

    /// Rebuild from scratch out of per-node out-neighbour sets.
    ///
    /// Nodes without out-neighbours keep everything (`M[i][i] = 1.0`).
    pub fn build<R: Rng>(
        neighbors: &[BTreeSet<usize>],
        weighting: &mut Weighting<'_, R>,
    ) -> Result<Self> {
        let mut mat = Self::zeros(neighbors.len());
        for (i, nbrs) in neighbors.iter().enumerate() {
            if nbrs.is_empty() {
                continue;
            }
            match weighting {
                Weighting::Uniform => {
                    let w = 1.0 / nbrs.len() as f64;
                    for &j in nbrs {
                        mat.data[[i, j]] = w;
                    }
                }
                Weighting::Random(rng) => {
                    let parts = random_composition(WEIGHT_UNITS, nbrs.len(), &mut **rng)?;
                    for (&j, part) in nbrs.iter().zip(parts) {
                        mat.data[[i, j]] = part as f64 / WEIGHT_UNITS as f64;
                    }
                }
            }
        }
        mat.fill_loner_rows();
        Ok(mat)
    }

    pub fn size(&self) -> usize {
        self.data.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[[i, j]] = value;
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Owned copy as nested rows, for JSON and JS callers.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.outer_iter().map(|r| r.to_vec()).collect()
    }

    pub fn row_sums(&self) -> Array1<f64> {
        self.data.sum_axis(Axis(1))
    }

    pub fn is_row_stochastic(&self, tolerance: f64) -> bool {
        self.data.iter().all(|&v| v >= 0.0)
            && self.row_sums().iter().all(|s| (s - 1.0).abs() <= tolerance)
    }

    /// `M · v`.
    pub fn apply(&self, v: &Array1<f64>) -> Array1<f64> {
        self.data.dot(v)
    }

    /// `Mᵗ · v`: entry j collects `M[i][j] * v[i]` over every i.
    pub fn apply_transpose(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.size());
        self.data.t().dot(&ArrayView1::from(v)).to_vec()
    }

    /// Loner fallback: an all-zero row becomes full self-retention.
    fn fill_loner_rows(&mut self) {
        for i in 0..self.size() {
            if self.data.row(i).iter().all(|&v| v == 0.0) {
                self.data[[i, i]] = 1.0;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Random composition
// ---------------------------------------------------------------------------

/// Split `total` into `parts` positive integers: `parts - 1` distinct cut
/// points in `[1, total)`, sorted, then consecutive differences.
pub fn random_composition<R: Rng + ?Sized>(
    total: usize,
    parts: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    if parts == 0 {
        return Ok(Vec::new());
    }
    if parts > total {
        return Err(SimError::WeightPartition { degree: parts });
    }
    let mut cuts: Vec<usize> = rand::seq::index::sample(rng, total - 1, parts - 1)
        .into_iter()
        .map(|c| c + 1)
        .collect();
    cuts.sort_unstable();
    cuts.push(total);
    let mut prev = 0;
    Ok(cuts
        .into_iter()
        .map(|c| {
            let part = c - prev;
            prev = c;
            part
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
