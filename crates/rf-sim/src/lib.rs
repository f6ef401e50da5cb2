//! Adaptive time stepping for resflow.
//!
//! Provides:
//! - [`SubstepController`]: trial step proposal, growth and cut policy
//! - [`ReportStepDriver`]: advances a model through one report step as a
//!   sequence of accepted substeps, applying schedule events and restoring
//!   the pre-attempt snapshot on every cut
//! - [`FailureAccumulator`], [`StepReport`], [`SimulationReport`]: run
//!   statistics
//! - [`OutputSink`]: per-substep output hook
//! - [`CancelToken`]: cooperative cancellation between substeps

pub mod cancel;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod report;
pub mod schedule;
pub mod sink;

pub use cancel::CancelToken;
pub use config::TimeStepConfig;
pub use controller::{ControllerPhase, Proposal, ProposalBounds, SubstepController};
pub use driver::ReportStepDriver;
pub use error::{AbortReason, SimError, SimResult};
pub use report::{FailureAccumulator, SimulationReport, StepReport, SubstepSummary};
pub use schedule::ReportStep;
pub use sink::{NullSink, OutputSink, SinkError, SubstepResult};
