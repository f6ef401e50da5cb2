//! Output hook called once per accepted substep.

use rf_solver::{ConvergenceReport, ModelState};
use thiserror::Error;

use crate::report::StepReport;

/// Failure reported by an [`OutputSink`]. The driver logs and counts it; a
/// sink failure never stops the simulation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Output sink error: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An accepted substep as seen by the sink.
#[derive(Debug, Clone, Copy)]
pub struct SubstepResult<'a> {
    pub report_step: usize,
    pub substep: usize,
    /// Time at the end of the substep.
    pub time: f64,
    pub length: f64,
    pub cuts: usize,
    /// Length the controller will start the next substep from.
    pub suggested_next_step: f64,
    pub convergence: &'a ConvergenceReport,
    pub state: &'a ModelState,
}

pub trait OutputSink {
    /// The state a run starts from, before any substep. Only called at the
    /// first report step of a run.
    fn write_initial_state(&mut self, _state: &ModelState) -> Result<(), SinkError> {
        Ok(())
    }

    fn write_time_step(&mut self, result: &SubstepResult<'_>) -> Result<(), SinkError>;

    fn end_report_step(&mut self, _report: &StepReport) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write_time_step(&mut self, _result: &SubstepResult<'_>) -> Result<(), SinkError> {
        Ok(())
    }
}
