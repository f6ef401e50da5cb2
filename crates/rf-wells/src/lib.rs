//! Well control primitives for resflow.
//!
//! A well is operated under exactly one control mode at a time: a surface
//! rate target on one phase, a bottomhole pressure (BHP) target, a group
//! allocation, or shut. Physical limits (BHP bounds, per-phase rate caps)
//! are checked against the solution the reservoir model proposes for each
//! Newton iteration, and the [`WellControlStateMachine`] switches the well to
//! whichever constraint is binding.
//!
//! # Architecture
//!
//! - [`WellState`] holds the active mode, its target, the last computed
//!   rates/BHP and the limit set
//! - [`WellControlStateMachine`] evaluates proposals and applies at most one
//!   switch per well per iteration
//! - [`ScheduleEvent`] carries externally scheduled shut-ins, reopenings,
//!   control and limit changes
//! - [`EconomicLimits`] flag wells that should be shut after a step

pub mod control;
pub mod error;
pub mod events;
pub mod limits;
pub mod machine;
pub mod phase;
pub mod state;

pub use control::{ControlMode, ControlSpec, RatePhase, WellKind};
pub use error::{WellError, WellResult};
pub use events::{EventKind, EventTarget, ScheduleEvent};
pub use limits::{EconomicBreach, EconomicLimits, LimitSet, RateCaps, Violation};
pub use machine::{ControlDecision, SwitchConfig, WellControlStateMachine};
pub use phase::{Phase, PhaseRates};
pub use state::{WellSolution, WellState};
