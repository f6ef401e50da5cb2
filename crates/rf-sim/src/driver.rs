//! Report step orchestration.

use rf_core::{Stopwatch, nearly_equal};
use rf_solver::{Assembler, DenseLuSolver, LinearSolver, ModelState, NonlinearSolver};
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::controller::{ProposalBounds, SubstepController};
use crate::error::{SimError, SimResult};
use crate::report::{FailureAccumulator, SimulationReport, StepReport};
use crate::schedule::ReportStep;
use crate::sink::{OutputSink, SubstepResult};

/// Advances a model through report steps.
///
/// Each report step is consumed as a sequence of accepted substeps. A failed
/// attempt restores the state captured before it, cuts the trial length and
/// retries; when cutting is no longer allowed the step aborts and `state` is
/// left at the last committed substep.
#[derive(Debug, Clone)]
pub struct ReportStepDriver<L = DenseLuSolver> {
    solver: NonlinearSolver<L>,
    controller: SubstepController,
    cancel: Option<CancelToken>,
}

impl<L: LinearSolver> ReportStepDriver<L> {
    pub fn new(solver: NonlinearSolver<L>, controller: SubstepController) -> Self {
        Self {
            solver,
            controller,
            cancel: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn solver(&self) -> &NonlinearSolver<L> {
        &self.solver
    }

    pub fn controller(&self) -> &SubstepController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SubstepController {
        &mut self.controller
    }

    /// Run one report step from `state.time`.
    pub fn run<A, S>(
        &mut self,
        step: &ReportStep,
        assembler: &A,
        state: &mut ModelState,
        sink: &mut S,
        failures: &mut FailureAccumulator,
    ) -> SimResult<StepReport>
    where
        A: Assembler + ?Sized,
        S: OutputSink + ?Sized,
    {
        if !(step.duration.is_finite() && step.duration > 0.0) {
            return Err(SimError::InvalidArg {
                what: "report step duration must be positive",
            });
        }
        if let Some(config) = &step.time_stepping {
            self.controller.update_config(config.clone())?;
            info!(
                step = step.index,
                adaptive = config.adaptive,
                "time stepping updated"
            );
        }
        let tol = self.controller.config().time_tolerance;
        if !nearly_equal(state.time, step.start_time, tol) {
            return Err(SimError::InvalidArg {
                what: "model time does not match report step start",
            });
        }
        state.time = step.start_time;

        let end = step.end_time();
        let mut report = StepReport::new(step.index, step.start_time);
        let mut pending = step.events.iter().peekable();
        let mut after_event = false;
        self.controller.begin_report_step();

        loop {
            while let Some(event) =
                pending.next_if(|e| e.time <= state.time || nearly_equal(e.time, state.time, tol))
            {
                let changed = self
                    .solver
                    .well_control_mut()
                    .apply_event(&mut state.wells, event)?;
                info!(
                    time = state.time,
                    event_target = ?event.target,
                    kind = ?event.kind,
                    changed,
                    "schedule event applied"
                );
                report.events_applied += 1;
                after_event = true;
            }

            if state.time >= end || nearly_equal(state.time, end, tol) {
                break;
            }
            if let Some(token) = &self.cancel
                && token.is_cancelled()
            {
                warn!(time = state.time, "simulation cancelled");
                return Err(SimError::Cancelled {
                    last_committed_time: state.time,
                });
            }

            let bounds = ProposalBounds {
                remaining: end - state.time,
                until_event: pending.peek().map(|e| e.time - state.time),
                after_event,
            };
            let mut proposal = self.controller.propose(bounds);
            let snapshot = state.snapshot();

            let convergence = loop {
                let conv = self.solver.solve(assembler, state, proposal.length);
                if conv.converged {
                    break conv;
                }
                failures.record_failed_attempt(&conv);
                state.restore(&snapshot);
                match self.controller.cut(proposal.length) {
                    Ok(next) => {
                        failures.record_cut();
                        report.cuts += 1;
                        warn!(
                            time = state.time,
                            failed = proposal.length,
                            retry = next,
                            iterations = conv.iteration_count,
                            reason = %conv.failure.as_ref().map(ToString::to_string).unwrap_or_default(),
                            "substep cut"
                        );
                        proposal = self.controller.propose(ProposalBounds {
                            remaining: end - state.time,
                            until_event: bounds.until_event,
                            after_event,
                        });
                    }
                    Err(reason) => {
                        error!(
                            time = state.time,
                            reason = %reason,
                            cuts = failures.substep_cuts,
                            "report step aborted"
                        );
                        return Err(SimError::Aborted {
                            reason,
                            last_committed_time: state.time,
                            failures: *failures,
                        });
                    }
                }
            };

            let cuts = self.controller.cuts_this_substep();
            state.commit(proposal.length);
            if nearly_equal(state.time, end, tol) {
                state.time = end;
            }
            self.controller.accept(proposal, convergence.iteration_count);
            after_event = false;

            report.record_accepted(state.time, proposal.length, cuts, &convergence);
            info!(
                time = state.time,
                length = proposal.length,
                iterations = convergence.iteration_count,
                cuts,
                "substep accepted"
            );

            let mut watch = Stopwatch::started();
            let written = sink.write_time_step(&SubstepResult {
                report_step: step.index,
                substep: report.substeps.len() - 1,
                time: state.time,
                length: proposal.length,
                cuts,
                suggested_next_step: self.controller.suggested_next_step(),
                convergence: &convergence,
                state,
            });
            report.output_time_s += watch.stop();
            if let Err(e) = written {
                warn!(error = %e, "output write failed");
                report.output_failures += 1;
            }

            // Written first: the substep was produced under the old control.
            let shut = self
                .solver
                .well_control_mut()
                .apply_economic_limits(&mut state.wells);
            report.wells_shut_economic.extend(shut);
        }

        report.end_time = state.time;
        report.suggested_next_step = self.controller.suggested_next_step();
        if let Err(e) = sink.end_report_step(&report) {
            warn!(error = %e, "report step output failed");
            report.output_failures += 1;
        }
        info!(
            step = step.index,
            end = report.end_time,
            substeps = report.substeps.len(),
            cuts = report.cuts,
            newton = report.nonlinear_iterations,
            "report step done"
        );
        Ok(report)
    }

    /// Hand the starting state to `sink`. Returns whether the write failed;
    /// a failure is logged and never fatal.
    pub fn write_initial_state<S>(&self, state: &ModelState, sink: &mut S) -> bool
    where
        S: OutputSink + ?Sized,
    {
        match sink.write_initial_state(state) {
            Ok(()) => false,
            Err(e) => {
                warn!(error = %e, "initial state output failed");
                true
            }
        }
    }

    /// Run consecutive report steps. Stops at the first error; `state` is
    /// then valid at the error's last committed time. The initial state is
    /// written first when the schedule starts at report step 0.
    pub fn run_schedule<A, S>(
        &mut self,
        steps: &[ReportStep],
        assembler: &A,
        state: &mut ModelState,
        sink: &mut S,
        failures: &mut FailureAccumulator,
    ) -> SimResult<SimulationReport>
    where
        A: Assembler + ?Sized,
        S: OutputSink + ?Sized,
    {
        let mut total = SimulationReport {
            end_time: state.time,
            ..Default::default()
        };
        if steps.first().is_some_and(|s| s.index == 0) && self.write_initial_state(state, sink) {
            total.output_failures += 1;
        }
        for step in steps {
            let report = self.run(step, assembler, state, sink, failures)?;
            total.add(&report);
        }
        Ok(total)
    }
}
