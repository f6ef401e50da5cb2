//! The seam between the Newton driver and the reservoir model.

use nalgebra::{DMatrix, DVector};
use rf_wells::{WellSolution, WellState};

use crate::error::SolverResult;
use crate::state::ModelState;

/// Residual and Jacobian of the discretized equations at one iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct Linearization {
    pub residual: DVector<f64>,
    pub jacobian: DMatrix<f64>,
}

/// A discretized reservoir model.
///
/// Implementations must be pure: the same state and increment give the same
/// linearization. Well terms are assembled under each well's active control.
pub trait Assembler {
    fn assemble(&self, state: &ModelState, dt: f64) -> SolverResult<Linearization>;

    /// Rates and BHP of `well` under its active control at the current
    /// unknowns.
    fn well_solution(&self, state: &ModelState, well: &WellState) -> WellSolution;

    /// Convergence measures of a residual, one per tolerance.
    fn residual_norms(&self, residual: &DVector<f64>) -> Vec<f64> {
        vec![residual.amax()]
    }
}
