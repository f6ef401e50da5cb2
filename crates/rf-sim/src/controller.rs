//! Substep length control.

use rf_core::nearly_equal;
use tracing::debug;

use crate::config::TimeStepConfig;
use crate::error::{AbortReason, SimResult};

/// Where the controller is in the propose/solve/accept/cut cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Propose,
    Solve,
    Accept,
    Cut,
    Abort,
}

/// Limits a proposal must respect beyond the configured ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalBounds {
    /// Time left in the report step.
    pub remaining: f64,
    /// Time until the next pending schedule event, if one falls inside the
    /// report step.
    pub until_event: Option<f64>,
    /// Events were applied since the last accepted substep.
    pub after_event: bool,
}

/// A trial substep length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    pub length: f64,
    /// The length was cut back to reach the end of the report step or the
    /// next event rather than chosen by the step policy.
    pub clamped: bool,
}

/// Proposes trial lengths, grows them after easy solves and cuts them after
/// failed ones.
///
/// The suggested next step and the last accepted length both survive
/// report-step boundaries, so the growth cap holds across them too.
#[derive(Debug, Clone)]
pub struct SubstepController {
    config: TimeStepConfig,
    phase: ControllerPhase,
    suggested: Option<f64>,
    last_accepted: Option<f64>,
    cuts_this_substep: usize,
}

impl SubstepController {
    pub fn new(config: TimeStepConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            phase: ControllerPhase::Propose,
            suggested: None,
            last_accepted: None,
            cuts_this_substep: 0,
        })
    }

    pub fn config(&self) -> &TimeStepConfig {
        &self.config
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn cuts_this_substep(&self) -> usize {
        self.cuts_this_substep
    }

    /// Length the next substep will start from, before clamping.
    pub fn suggested_next_step(&self) -> f64 {
        self.suggested.unwrap_or(self.config.initial_step)
    }

    /// Replace the sizing policy mid-run. The suggested next step is kept,
    /// clipped to the new `max_step`.
    pub fn update_config(&mut self, config: TimeStepConfig) -> SimResult<()> {
        config.validate()?;
        if let Some(dt) = self.suggested.as_mut() {
            *dt = dt.min(config.max_step);
        }
        debug!(
            adaptive = config.adaptive,
            max_step = config.max_step,
            "time stepping reconfigured"
        );
        self.config = config;
        Ok(())
    }

    /// Seed the next proposal, e.g. when resuming from a saved state.
    pub fn set_suggested_next_step(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.suggested = Some(dt.min(self.config.max_step));
        }
    }

    pub fn begin_report_step(&mut self) {
        self.cuts_this_substep = 0;
        self.phase = ControllerPhase::Propose;
    }

    /// Trial length for the next attempt.
    pub fn propose(&mut self, bounds: ProposalBounds) -> Proposal {
        self.phase = ControllerPhase::Propose;
        let mut length = if self.config.adaptive {
            self.suggested_next_step().min(self.config.max_step)
        } else {
            bounds.remaining
        };
        if self.config.adaptive {
            if let Some(prev) = self.last_accepted {
                length = length.min(self.config.max_growth * prev);
            }
            if bounds.after_event
                && let Some(cap) = self.config.step_after_event
            {
                length = length.min(cap);
            }
        }

        let mut clamped = false;
        let tol = self.config.time_tolerance;
        if length >= bounds.remaining || nearly_equal(length, bounds.remaining, tol) {
            length = bounds.remaining;
            clamped = true;
        }
        if let Some(until) = bounds.until_event
            && (length >= until || nearly_equal(length, until, tol))
        {
            length = until;
            clamped = true;
        }

        debug!(length, clamped, cuts = self.cuts_this_substep, "substep proposed");
        self.phase = ControllerPhase::Solve;
        Proposal { length, clamped }
    }

    /// Shrink after a failed attempt of length `trial`.
    ///
    /// Returns the length to retry with, or why the substep cannot be
    /// retried. The cut counter only advances on a successful cut.
    pub fn cut(&mut self, trial: f64) -> Result<f64, AbortReason> {
        if !self.config.adaptive {
            self.phase = ControllerPhase::Abort;
            return Err(AbortReason::NotAdaptive);
        }
        if self.cuts_this_substep >= self.config.max_cuts {
            self.phase = ControllerPhase::Abort;
            return Err(AbortReason::CutLimit {
                max_cuts: self.config.max_cuts,
            });
        }
        let next = trial * self.config.cut_factor;
        if next < self.config.min_step {
            self.phase = ControllerPhase::Abort;
            return Err(AbortReason::StepBelowFloor {
                trial: next,
                min_step: self.config.min_step,
            });
        }
        self.cuts_this_substep += 1;
        self.suggested = Some(next);
        self.phase = ControllerPhase::Cut;
        Ok(next)
    }

    /// Record a converged substep and pick the next suggested length.
    pub fn accept(&mut self, proposal: Proposal, newton_iterations: usize) {
        self.phase = ControllerPhase::Accept;
        let length = proposal.length;
        let c = &self.config;

        let factor = if newton_iterations <= c.fast_iterations {
            c.growth_factor
        } else if newton_iterations >= c.slow_iterations {
            c.decay_factor
        } else {
            1.0
        };
        let mut next = (length * factor).min(c.max_growth * length).min(c.max_step);
        if self.cuts_this_substep > 0 {
            next = next.min(c.growth_after_cut * length);
        } else if proposal.clamped {
            // A step shortened to land on a boundary says nothing about how
            // hard the solve was.
            next = next.max(self.suggested_next_step().min(c.max_step));
        }

        self.suggested = Some(next);
        self.last_accepted = Some(length);
        self.cuts_this_substep = 0;
    }
}
