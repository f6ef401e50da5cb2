//! Time step control configuration.

use rf_core::Tolerances;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Substep sizing policy. All lengths are seconds.
///
/// After a converged substep the next length is scaled by `growth_factor`
/// when the solve took at most `fast_iterations` Newton iterations, by
/// `decay_factor` when it took at least `slow_iterations`, and held
/// otherwise. Growth relative to the previous accepted substep never
/// exceeds `max_growth`.
///
/// With `adaptive` off each report step is solved in one piece (split only
/// at schedule events) and a failed solve aborts the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeStepConfig {
    pub adaptive: bool,
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    /// Factor applied to the trial length on every cut.
    pub cut_factor: f64,
    pub max_cuts: usize,
    pub growth_factor: f64,
    pub decay_factor: f64,
    pub max_growth: f64,
    pub fast_iterations: usize,
    pub slow_iterations: usize,
    /// Growth cap for the substep after one that needed cuts.
    pub growth_after_cut: f64,
    /// Cap on the first substep after schedule events were applied.
    pub step_after_event: Option<f64>,
    #[serde(skip)]
    pub time_tolerance: Tolerances,
}

const DAY: f64 = 86_400.0;

impl Default for TimeStepConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            initial_step: DAY,
            min_step: 1e-12 * DAY,
            max_step: 365.0 * DAY,
            cut_factor: 0.33,
            max_cuts: 10,
            growth_factor: 2.0,
            decay_factor: 0.75,
            max_growth: 3.0,
            fast_iterations: 5,
            slow_iterations: 15,
            growth_after_cut: 1.0,
            step_after_event: None,
            time_tolerance: Tolerances {
                abs: 1e-9,
                rel: 1e-12,
            },
        }
    }
}

impl TimeStepConfig {
    pub fn validate(&self) -> SimResult<()> {
        let positive = [
            (self.initial_step, "initial_step must be positive"),
            (self.min_step, "min_step must be positive"),
            (self.max_step, "max_step must be positive"),
            (self.growth_factor, "growth_factor must be positive"),
            (self.decay_factor, "decay_factor must be positive"),
            (self.max_growth, "max_growth must be positive"),
            (self.growth_after_cut, "growth_after_cut must be positive"),
        ];
        for (value, what) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidArg { what });
            }
        }
        if !(self.cut_factor > 0.0 && self.cut_factor < 1.0) {
            return Err(SimError::InvalidArg {
                what: "cut_factor must be in (0, 1)",
            });
        }
        if self.min_step > self.max_step {
            return Err(SimError::InvalidArg {
                what: "min_step must not exceed max_step",
            });
        }
        if self.fast_iterations >= self.slow_iterations {
            return Err(SimError::InvalidArg {
                what: "fast_iterations must be below slow_iterations",
            });
        }
        if let Some(dt) = self.step_after_event
            && !(dt.is_finite() && dt > 0.0)
        {
            return Err(SimError::InvalidArg {
                what: "step_after_event must be positive",
            });
        }
        Ok(())
    }
}
