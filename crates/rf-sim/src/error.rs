//! Error types for simulation operations.

use std::fmt;

use rf_solver::SolverError;
use rf_wells::WellError;
use thiserror::Error;

use crate::report::FailureAccumulator;

/// Why the substep controller gave up on a report step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbortReason {
    /// The substep failed after the maximum number of cuts.
    CutLimit { max_cuts: usize },
    /// Cutting again would take the trial step below the floor.
    StepBelowFloor { trial: f64, min_step: f64 },
    /// A solve failed while adaptive stepping is off.
    NotAdaptive,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::CutLimit { max_cuts } => {
                write!(f, "substep still failing after {max_cuts} cuts")
            }
            AbortReason::StepBelowFloor { trial, min_step } => {
                write!(f, "trial step {trial:.6e} s below minimum {min_step:.6e} s")
            }
            AbortReason::NotAdaptive => {
                write!(f, "solve failed with adaptive time stepping disabled")
            }
        }
    }
}

/// Errors encountered while driving a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(
        "Simulation aborted: {reason}; last committed time {last_committed_time} s \
         ({} cuts, {} failed Newton iterations)",
        .failures.substep_cuts,
        .failures.nonlinear_iterations_total
    )]
    Aborted {
        reason: AbortReason,
        last_committed_time: f64,
        failures: FailureAccumulator,
    },

    #[error("Simulation cancelled at {last_committed_time} s")]
    Cancelled { last_committed_time: f64 },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] WellError),
}

impl SimError {
    /// Time the model state is valid at after the error.
    pub fn last_committed_time(&self) -> Option<f64> {
        match self {
            SimError::Aborted {
                last_committed_time,
                ..
            }
            | SimError::Cancelled {
                last_committed_time,
            } => Some(*last_committed_time),
            _ => None,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
