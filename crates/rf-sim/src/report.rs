//! Run statistics.

use rf_solver::ConvergenceReport;
use serde::{Deserialize, Serialize};

/// Work thrown away by failed substep attempts over a whole run.
///
/// Owned by the caller and passed to every report step so the counts are
/// additive across the run; nothing in the driver resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FailureAccumulator {
    pub substep_cuts: usize,
    pub failed_attempts: usize,
    pub nonlinear_iterations_total: usize,
    pub linear_iterations_total: usize,
    pub linearizations_total: usize,
}

impl FailureAccumulator {
    pub fn record_failed_attempt(&mut self, report: &ConvergenceReport) {
        self.failed_attempts += 1;
        self.nonlinear_iterations_total += report.iteration_count;
        self.linear_iterations_total += report.linear_iterations;
        self.linearizations_total += report.linearizations;
    }

    pub fn record_cut(&mut self) {
        self.substep_cuts += 1;
    }
}

/// One accepted substep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstepSummary {
    pub time: f64,
    pub length: f64,
    pub cuts: usize,
    pub newton_iterations: usize,
    pub linear_iterations: usize,
    pub well_switches: usize,
}

/// Statistics of one report step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub substeps: Vec<SubstepSummary>,
    pub cuts: usize,
    pub nonlinear_iterations: usize,
    pub linear_iterations: usize,
    pub linearizations: usize,
    pub well_switches: usize,
    pub events_applied: usize,
    pub wells_shut_economic: Vec<String>,
    pub output_failures: usize,
    /// Suggested length of the first substep of the next report step.
    pub suggested_next_step: f64,
    pub solver_time_s: f64,
    pub output_time_s: f64,
}

impl StepReport {
    pub fn new(index: usize, start_time: f64) -> Self {
        Self {
            index,
            start_time,
            end_time: start_time,
            ..Default::default()
        }
    }

    pub fn accepted_lengths(&self) -> Vec<f64> {
        self.substeps.iter().map(|s| s.length).collect()
    }

    pub fn advanced(&self) -> f64 {
        self.substeps.iter().map(|s| s.length).sum()
    }

    /// Count a converged solve. Work of failed attempts goes to the
    /// [`FailureAccumulator`] instead.
    pub(crate) fn record_accepted(&mut self, time: f64, length: f64, cuts: usize, conv: &ConvergenceReport) {
        self.nonlinear_iterations += conv.iteration_count;
        self.linear_iterations += conv.linear_iterations;
        self.linearizations += conv.linearizations;
        self.well_switches += conv.switch_count;
        self.solver_time_s += conv.wall_time_s;
        self.end_time = time;
        self.substeps.push(SubstepSummary {
            time,
            length,
            cuts,
            newton_iterations: conv.iteration_count,
            linear_iterations: conv.linear_iterations,
            well_switches: conv.switch_count,
        });
    }
}

/// Totals over every report step of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationReport {
    pub report_steps: usize,
    pub substeps: usize,
    pub cuts: usize,
    pub nonlinear_iterations: usize,
    pub linear_iterations: usize,
    pub linearizations: usize,
    pub well_switches: usize,
    pub output_failures: usize,
    pub suggested_next_step: f64,
    pub solver_time_s: f64,
    pub output_time_s: f64,
    pub end_time: f64,
}

impl SimulationReport {
    pub fn add(&mut self, step: &StepReport) {
        self.report_steps += 1;
        self.substeps += step.substeps.len();
        self.cuts += step.cuts;
        self.nonlinear_iterations += step.nonlinear_iterations;
        self.linear_iterations += step.linear_iterations;
        self.linearizations += step.linearizations;
        self.well_switches += step.well_switches;
        self.output_failures += step.output_failures;
        self.solver_time_s += step.solver_time_s;
        self.output_time_s += step.output_time_s;
        self.suggested_next_step = step.suggested_next_step;
        self.end_time = step.end_time;
    }
}
