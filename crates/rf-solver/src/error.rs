//! Error types for solver operations.

use rf_core::CoreError;
use rf_wells::WellError;
use thiserror::Error;

/// Errors raised by assemblers and solver setup.
///
/// Newton non-convergence is not among them: it is reported through
/// [`crate::ConvergenceReport`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Invalid solver configuration: {what}")]
    InvalidConfig { what: &'static str },

    #[error("Dimension mismatch: {what}")]
    Dimension { what: String },

    #[error("Assembly failed: {what}")]
    Assembly { what: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Well error: {0}")]
    Well(#[from] WellError),
}

pub type SolverResult<T> = Result<T, SolverError>;
