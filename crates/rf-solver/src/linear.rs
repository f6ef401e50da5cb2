//! Linear solver seam.

use nalgebra::{DMatrix, DVector};

/// Result of one linear solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSolveOutcome {
    /// Solution of `J * update = residual`; the Newton step subtracts it.
    pub update: DVector<f64>,
    pub iterations: usize,
    pub success: bool,
}

impl LinearSolveOutcome {
    pub fn failed(len: usize, iterations: usize) -> Self {
        Self {
            update: DVector::zeros(len),
            iterations,
            success: false,
        }
    }
}

pub trait LinearSolver {
    fn solve(&mut self, jacobian: &DMatrix<f64>, residual: &DVector<f64>) -> LinearSolveOutcome;
}

/// Direct solve by LU decomposition with partial pivoting.
///
/// Counts as one linear iteration per solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLuSolver;

impl LinearSolver for DenseLuSolver {
    fn solve(&mut self, jacobian: &DMatrix<f64>, residual: &DVector<f64>) -> LinearSolveOutcome {
        let n = residual.len();
        if !jacobian.is_square() || jacobian.nrows() != n {
            return LinearSolveOutcome::failed(n, 0);
        }
        match jacobian.clone().lu().solve(residual) {
            Some(update) if update.iter().all(|v| v.is_finite()) => LinearSolveOutcome {
                update,
                iterations: 1,
                success: true,
            },
            _ => LinearSolveOutcome::failed(n, 1),
        }
    }
}
