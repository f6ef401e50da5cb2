//! Per-well mutable state.

use rf_core::{Tolerances, WellId, exceeds, falls_below};

use crate::control::{ControlMode, ControlSpec, RatePhase, WellKind};
use crate::error::{WellError, WellResult};
use crate::limits::{EconomicLimits, LimitSet, Violation};
use crate::phase::{Phase, PhaseRates};

/// Rates and BHP a reservoir model computes for a well under its active
/// control and the current reservoir unknowns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellSolution {
    pub rates: PhaseRates,
    pub bhp: f64,
}

impl WellSolution {
    pub fn new(rates: PhaseRates, bhp: f64) -> Self {
        Self { rates, bhp }
    }
}

/// Operating state of one well.
///
/// `control_mode`/`target_value` are what the well is currently held to;
/// `configured` is what the schedule asked for and what a reopened well
/// returns to. The configured rate target also acts as a rate limit, so a
/// well pushed onto BHP control comes back to it once it binds again.
#[derive(Debug, Clone, PartialEq)]
pub struct WellState {
    pub id: WellId,
    pub name: String,
    pub group: Option<String>,
    pub kind: WellKind,
    pub control_mode: ControlMode,
    pub target_value: f64,
    pub current_rates: PhaseRates,
    pub current_bhp: f64,
    pub limits: LimitSet,
    pub economic: EconomicLimits,
    pub configured: ControlSpec,
}

impl WellState {
    /// Create an open well running its configured control.
    pub fn new(
        id: WellId,
        name: impl Into<String>,
        kind: WellKind,
        configured: ControlSpec,
        limits: LimitSet,
    ) -> WellResult<Self> {
        let name = name.into();
        validate_control(&name, kind, configured)?;
        if configured.mode == ControlMode::Shut {
            return Err(WellError::InvalidControl {
                well: name,
                mode: configured.mode.to_string(),
                reason: "configured control must be operable; use initially_shut",
            });
        }
        limits.validate()?;
        Ok(Self {
            id,
            name,
            group: None,
            kind,
            control_mode: configured.mode,
            target_value: configured.target,
            current_rates: PhaseRates::ZERO,
            current_bhp: 0.0,
            limits,
            economic: EconomicLimits::default(),
            configured,
        })
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_economic_limits(mut self, economic: EconomicLimits) -> Self {
        self.economic = economic;
        self
    }

    /// Start the well shut; a later `Open` event puts it on its configured
    /// control.
    pub fn initially_shut(mut self) -> Self {
        self.control_mode = ControlMode::Shut;
        self.target_value = 0.0;
        self
    }

    pub fn is_shut(&self) -> bool {
        self.control_mode == ControlMode::Shut
    }

    pub fn active_control(&self) -> ControlSpec {
        ControlSpec::new(self.control_mode, self.target_value)
    }

    pub(crate) fn set_control(&mut self, spec: ControlSpec) {
        self.control_mode = spec.mode;
        self.target_value = spec.target;
        if spec.mode == ControlMode::Shut {
            self.current_rates = PhaseRates::ZERO;
        }
    }

    /// Store the rates/BHP computed for the current iterate.
    pub fn record_solution(&mut self, solution: &WellSolution) {
        self.current_rates = solution.rates;
        self.current_bhp = solution.bhp;
    }

    pub fn current_solution(&self) -> WellSolution {
        WellSolution::new(self.current_rates, self.current_bhp)
    }

    /// Binding BHP bound: the tighter of the limit set and a configured BHP
    /// target. Lower bound for producers, upper bound for injectors.
    pub fn effective_bhp_limit(&self) -> Option<f64> {
        let configured = (self.configured.mode == ControlMode::Bhp).then_some(self.configured.target);
        match self.kind {
            WellKind::Producer => max_option(self.limits.min_bhp, configured),
            WellKind::Injector { .. } => min_option(self.limits.max_bhp, configured),
        }
    }

    /// Every rate constraint on the well: the configured rate control (if
    /// any) followed by the rate caps.
    pub fn rate_constraints(&self) -> Vec<ControlSpec> {
        let mut out = Vec::with_capacity(5);
        if self.configured.mode.is_rate() {
            out.push(self.configured);
        }
        for (phase, cap) in self.limits.max_rates.iter() {
            out.push(ControlSpec::new(ControlMode::Rate(phase), cap));
        }
        out
    }

    /// Limits violated by `solution`. Shut wells violate nothing.
    pub fn violations(&self, solution: &WellSolution, tol: Tolerances) -> Vec<Violation> {
        let mut out = Vec::new();
        if self.is_shut() {
            return out;
        }
        if let Some(limit) = self.effective_bhp_limit() {
            match self.kind {
                WellKind::Producer if falls_below(solution.bhp, limit, tol) => {
                    out.push(Violation::BhpBelowMin {
                        bhp: solution.bhp,
                        limit,
                    });
                }
                WellKind::Injector { .. } if exceeds(solution.bhp, limit, tol) => {
                    out.push(Violation::BhpAboveMax {
                        bhp: solution.bhp,
                        limit,
                    });
                }
                _ => {}
            }
        }
        for constraint in self.rate_constraints() {
            let Some(phase) = constraint.mode.rate_phase() else {
                continue;
            };
            let rate = phase.rate(&solution.rates);
            if exceeds(rate, constraint.target, tol) {
                out.push(Violation::RateAboveMax {
                    phase,
                    rate,
                    limit: constraint.target,
                });
            }
        }
        out
    }

    /// Whether the last recorded rates/BHP honour every limit.
    pub fn satisfies_limits(&self, tol: Tolerances) -> bool {
        self.violations(&self.current_solution(), tol).is_empty()
    }
}

/// Check that `spec` can be applied to a well of `kind`.
pub(crate) fn validate_control(name: &str, kind: WellKind, spec: ControlSpec) -> WellResult<()> {
    let reject = |reason: &'static str| {
        Err(WellError::InvalidControl {
            well: name.to_string(),
            mode: spec.mode.to_string(),
            reason,
        })
    };
    if !spec.target.is_finite() {
        return reject("target must be finite");
    }
    if spec.mode.is_rate() && spec.target < 0.0 {
        return reject("rate target must be non-negative");
    }
    if let WellKind::Injector { phase } = kind
        && let Some(rate_phase) = spec.mode.rate_phase()
    {
        let allowed = rate_phase == RatePhase::from(phase)
            || (rate_phase == RatePhase::Liquid && phase == Phase::Water);
        if !allowed {
            return reject("injectors can only be rate controlled on the injected phase");
        }
    }
    Ok(())
}

fn max_option(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

fn min_option(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}
