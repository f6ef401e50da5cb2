//! Newton driver for one implicit time increment.
//!
//! The reservoir model is an opaque [`Assembler`]: given the current
//! [`ModelState`] and a time increment it returns the residual and Jacobian
//! of the discretized conservation equations. The linear system is handed to
//! a [`LinearSolver`]. [`NonlinearSolver`] iterates the two, keeps the wells
//! consistent with their limits through the well control state machine, and
//! reports the outcome as a [`ConvergenceReport`]. Numerical failure is a
//! report, never an error.

pub mod assembler;
pub mod error;
pub mod jacobian;
pub mod linear;
pub mod newton;
pub mod state;

pub use assembler::{Assembler, Linearization};
pub use error::{SolverError, SolverResult};
pub use jacobian::finite_difference_jacobian;
pub use linear::{DenseLuSolver, LinearSolveOutcome, LinearSolver};
pub use newton::{ConvergenceReport, IterationRecord, NewtonConfig, NonConvergence, NonlinearSolver};
pub use state::{ModelState, Snapshot};
