// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Convergence Analysis
//
// Diagnostics only: nothing here feeds back into the simulation.
// The dominant eigenpair and the scaling factor come from M itself; the
// Rayleigh quotient and the eigenvector check use the propagation operator
// Mᵗ, whose fixed point is the stationary balance distribution.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::matrix::TransitionMatrix;

/// Power-iteration stopping tolerance (max-norm step).
pub const POWER_TOLERANCE: f64 = 1e-12;
pub const POWER_MAX_ITERATIONS: usize = 10_000;

/// Absolute and relative tolerance of the eigenvector check.
pub const EIGEN_ATOL: f64 = 1e-2;
pub const EIGEN_RTOL: f64 = 1e-2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConvergenceReport {
    /// Dominant eigenvalue of M (shared with Mᵗ).
    pub eigenvalue: f64,
    /// Dominant right eigenvector of M, unit L2 norm, non-negative sum.
    pub eigenvector: Vec<f64>,
    /// Dominant eigenvector of Mᵗ, normalised the same way. Proportional
    /// to the balances the trade converges to.
    pub stationary: Vec<f64>,
    /// `(v · b) / (b · b)` with `v` the eigenvector of M.
    pub scaling_factor: f64,
    /// `(b · Mᵗb) / (b · b)`.
    pub rayleigh: f64,
    /// Whether `b` itself is (approximately) an eigenvector of Mᵗ for `eigenvalue`.
    pub is_eigenvector: bool,
    /// Power-iteration steps used for the eigenvector of M.
    pub iterations: usize,
}

fn normalised(mut v: Array1<f64>) -> Array1<f64> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v /= norm;
    }
    if v.sum() < 0.0 {
        v.mapv_inplace(|x| -x);
    }
    v
}

/// Iterates the lazy operator `(A + I) / 2`, which has the same
/// eigenvectors as `A` but no ±1 tie on periodic chains.
fn power_iteration(op: ArrayView2<'_, f64>) -> (f64, Array1<f64>, usize) {
    let n = op.nrows();
    if n == 0 {
        return (0.0, Array1::zeros(0), 0);
    }
    let mut v = Array1::from_elem(n, 1.0 / (n as f64).sqrt());
    let mut steps = 0;
    while steps < POWER_MAX_ITERATIONS {
        steps += 1;
        let next = normalised((op.dot(&v) + &v) * 0.5);
        let delta = next
            .iter()
            .zip(v.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        v = next;
        if delta < POWER_TOLERANCE {
            break;
        }
    }
    let eigenvalue = v.dot(&op.dot(&v)) / v.dot(&v);
    (eigenvalue, v, steps)
}

/// Dominant eigenpair of M: eigenvalue, right eigenvector and the number
/// of steps taken.
pub fn dominant_eigenpair(matrix: &TransitionMatrix) -> (f64, Vec<f64>, usize) {
    let (eigenvalue, v, steps) = power_iteration(matrix.as_array().view());
    (eigenvalue, v.to_vec(), steps)
}

/// Dominant eigenvector of Mᵗ.
pub fn stationary_distribution(matrix: &TransitionMatrix) -> Vec<f64> {
    power_iteration(matrix.as_array().t()).1.to_vec()
}

/// Rayleigh quotient `(b · Mᵗb) / (b · b)`; zero for a zero vector.
pub fn rayleigh_quotient(matrix: &TransitionMatrix, b: &[f64]) -> f64 {
    let b = ArrayView1::from(b);
    let bb = b.dot(&b);
    if bb == 0.0 {
        return 0.0;
    }
    b.dot(&matrix.as_array().t().dot(&b)) / bb
}

/// Elementwise `|Mᵗb − λb| ≤ atol + rtol·|λb|`. A zero vector never counts.
pub fn is_eigenvector(matrix: &TransitionMatrix, b: &[f64], eigenvalue: f64) -> bool {
    if b.iter().all(|&x| x == 0.0) {
        return false;
    }
    let b = ArrayView1::from(b);
    let mb = matrix.as_array().t().dot(&b);
    mb.iter().zip(b.iter()).all(|(m, x)| {
        let lb = eigenvalue * x;
        (m - lb).abs() <= EIGEN_ATOL + EIGEN_RTOL * lb.abs()
    })
}

/// Full report for the current matrix and balances.
pub fn analyze(matrix: &TransitionMatrix, balances: &[f64]) -> ConvergenceReport {
    let (eigenvalue, eigenvector, iterations) = dominant_eigenpair(matrix);
    let b = ArrayView1::from(balances);
    let bb = b.dot(&b);
    let scaling_factor = if bb == 0.0 {
        0.0
    } else {
        ArrayView1::from(eigenvector.as_slice()).dot(&b) / bb
    };
    ConvergenceReport {
        eigenvalue,
        scaling_factor,
        stationary: stationary_distribution(matrix),
        rayleigh: rayleigh_quotient(matrix, balances),
        is_eigenvector: is_eigenvector(matrix, balances, eigenvalue),
        eigenvector,
        iterations,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric_triangle() -> TransitionMatrix {
        TransitionMatrix::from_rows(vec![
            vec![0.0, 0.5, 0.5],
            vec![0.5, 0.0, 0.5],
            vec![0.5, 0.5, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_uniform_vector_on_symmetric_triangle() {
        let m = symmetric_triangle();
        let report = analyze(&m, &[1.0, 1.0, 1.0]);
        assert!((report.rayleigh - 1.0).abs() < 1e-12);
        assert!((report.eigenvalue - 1.0).abs() < 1e-9);
        assert!(report.is_eigenvector);
        let expected = 1.0 / 3f64.sqrt();
        assert!(report.eigenvector.iter().all(|x| (x - expected).abs() < 1e-9));
    }

    fn asymmetric_chain() -> TransitionMatrix {
        // AA keeps half, sends half to AB; AB sends everything back.
        TransitionMatrix::from_rows(vec![vec![0.5, 0.5], vec![1.0, 0.0]]).unwrap()
    }

    #[test]
    fn test_stationary_distribution_of_asymmetric_chain() {
        // pi = (2/3, 1/3)
        let m = asymmetric_chain();
        let pi = stationary_distribution(&m);
        assert!((pi[0] / pi[1] - 2.0).abs() < 1e-6);
        assert!(is_eigenvector(&m, &[200.0, 100.0], 1.0));
        assert!(!is_eigenvector(&m, &[100.0, 200.0], 1.0));
    }

    #[test]
    fn test_eigenvector_is_right_eigenvector_of_matrix() {
        // Rows sum to one, so M·1 = 1 and the right eigenvector is uniform.
        let m = asymmetric_chain();
        let (lambda, v, _) = dominant_eigenpair(&m);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!((lambda - 1.0).abs() < 1e-9);
        assert!((v[0] - h).abs() < 1e-9 && (v[1] - h).abs() < 1e-9);

        let report = analyze(&m, &[200.0, 100.0]);
        assert!((report.scaling_factor - 300.0 * h / 50_000.0).abs() < 1e-9);
        assert!((report.scaling_factor - 0.0042426).abs() < 1e-7);
        assert!(report.is_eigenvector);
        assert!((report.stationary[0] / report.stationary[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_periodic_chain_converges() {
        let m = TransitionMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let (lambda, v, steps) = dominant_eigenpair(&m);
        assert!((lambda - 1.0).abs() < 1e-9);
        assert!((v[0] - v[1]).abs() < 1e-9);
        assert!(steps < POWER_MAX_ITERATIONS);
    }

    #[test]
    fn test_zero_balances() {
        let report = analyze(&symmetric_triangle(), &[0.0, 0.0, 0.0]);
        assert_eq!(report.scaling_factor, 0.0);
        assert_eq!(report.rayleigh, 0.0);
        assert!(!report.is_eigenvector);
    }

    #[test]
    fn test_scaling_factor_projects_onto_eigenvector() {
        let m = symmetric_triangle();
        let b = [10.0, 10.0, 10.0];
        let report = analyze(&m, &b);
        let v_dot_b = report.eigenvector.iter().zip(&b).map(|(v, x)| v * x).sum::<f64>();
        assert!((report.scaling_factor - v_dot_b / 300.0).abs() < 1e-12);
    }

    #[test]
    fn test_eigenvector_sum_non_negative() {
        let m = TransitionMatrix::from_rows(vec![
            vec![0.2, 0.8, 0.0],
            vec![0.0, 0.3, 0.7],
            vec![0.6, 0.0, 0.4],
        ])
        .unwrap();
        let (_, v, _) = dominant_eigenpair(&m);
        assert!(v.iter().sum::<f64>() >= 0.0);
        assert!((v.iter().map(|x| x * x).sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
