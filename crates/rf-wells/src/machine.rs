//! Control-mode switching.
//!
//! Transitions:
//! - rate or group-rate → BHP when honouring the rate would cross the BHP
//!   bound (producer below its minimum, injector above its maximum)
//! - any open mode → rate when a rate constraint other than the active one
//!   is exceeded; the most violated constraint wins, including a tighter cap
//!   on the controlled phase
//! - rate → configured control when the cap the well was held to is lifted
//! - BHP → BHP at the bound when a limit change leaves the held BHP outside it
//! - any mode → shut on a schedule event or an economic breach
//! - shut → configured control only through an `Open` event

use std::collections::HashMap;

use rf_core::{Tolerances, WellId};
use tracing::{info, warn};

use crate::control::{ControlMode, ControlSpec, WellKind};
use crate::error::WellResult;
use crate::events::{EventKind, ScheduleEvent};
use crate::limits::EconomicBreach;
use crate::state::{WellSolution, WellState, validate_control};

/// Switching configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchConfig {
    /// Band around a limit inside which no switch happens.
    pub tolerance: Tolerances,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerances {
                abs: 1e-12,
                rel: 1e-6,
            },
        }
    }
}

/// Outcome of evaluating one well against a proposed solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlDecision {
    Unchanged,
    Switched { from: ControlMode, to: ControlSpec },
}

impl ControlDecision {
    pub fn switched(&self) -> bool {
        matches!(self, ControlDecision::Switched { .. })
    }
}

/// Tracks control switches for the wells of one simulation.
///
/// Holds no well data itself; each call receives the well it acts on. The
/// only memory is which iteration each well last switched in, which caps
/// switching at one per well per Newton iteration.
#[derive(Debug, Clone, Default)]
pub struct WellControlStateMachine {
    config: SwitchConfig,
    switched_at: HashMap<WellId, usize>,
}

impl WellControlStateMachine {
    pub fn new(config: SwitchConfig) -> Self {
        Self {
            config,
            switched_at: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    /// Forget per-iteration switch records. Called at the start of every
    /// nonlinear solve.
    pub fn reset(&mut self) {
        self.switched_at.clear();
    }

    /// Evaluate `well` against `proposed` for Newton iteration `iteration`.
    ///
    /// Applies at most one switch per well per iteration; a second call for
    /// the same well and iteration returns `Unchanged`. Only the well's
    /// control mode and target are mutated.
    pub fn evaluate(
        &mut self,
        well: &mut WellState,
        proposed: &WellSolution,
        iteration: usize,
    ) -> ControlDecision {
        if well.is_shut() || self.switched_at.get(&well.id) == Some(&iteration) {
            return ControlDecision::Unchanged;
        }
        let Some(next) = self.next_control(well, proposed) else {
            return ControlDecision::Unchanged;
        };
        let from = well.control_mode;
        well.set_control(next);
        self.switched_at.insert(well.id, iteration);
        info!(
            well = %well.name,
            iteration,
            from = %from,
            to = %next.mode,
            target = next.target,
            "well control switched"
        );
        ControlDecision::Switched { from, to: next }
    }

    /// The control a well should move to, if its active one is infeasible.
    fn next_control(&self, well: &WellState, proposed: &WellSolution) -> Option<ControlSpec> {
        let tol = self.config.tolerance;
        match well.control_mode {
            ControlMode::Shut => None,
            ControlMode::Rate(_) | ControlMode::GroupRate => {
                // The cap the well was held to has been lifted or changed.
                let active = well.active_control();
                if !well.rate_constraints().contains(&active) {
                    return Some(well.configured);
                }
                if let Some(limit) = well.effective_bhp_limit() {
                    let crossed = match well.kind {
                        WellKind::Producer => rf_core::falls_below(proposed.bhp, limit, tol),
                        WellKind::Injector { .. } => rf_core::exceeds(proposed.bhp, limit, tol),
                    };
                    if crossed {
                        return Some(ControlSpec::new(ControlMode::Bhp, limit));
                    }
                }
                self.most_restrictive_rate(well, proposed)
            }
            ControlMode::Bhp => {
                // A limit change can leave the held BHP outside the new bound.
                if let Some(limit) = well.effective_bhp_limit() {
                    let outside = match well.kind {
                        WellKind::Producer => rf_core::falls_below(well.target_value, limit, tol),
                        WellKind::Injector { .. } => rf_core::exceeds(well.target_value, limit, tol),
                    };
                    if outside {
                        return Some(ControlSpec::new(ControlMode::Bhp, limit));
                    }
                }
                self.most_restrictive_rate(well, proposed)
            }
        }
    }

    /// Among the violated rate constraints, the one exceeded by the largest
    /// ratio. Only the exact active (mode, target) is skipped, so a tighter
    /// cap on the controlled phase still wins.
    fn most_restrictive_rate(&self, well: &WellState, proposed: &WellSolution) -> Option<ControlSpec> {
        let tol = self.config.tolerance;
        let active = well.active_control();
        let mut best: Option<(f64, ControlSpec)> = None;
        for constraint in well.rate_constraints() {
            if constraint == active {
                continue;
            }
            let Some(phase) = constraint.mode.rate_phase() else {
                continue;
            };
            let rate = phase.rate(&proposed.rates);
            if !rf_core::exceeds(rate, constraint.target, tol) {
                continue;
            }
            let ratio = if constraint.target > 0.0 {
                rate / constraint.target
            } else {
                f64::INFINITY
            };
            if best.is_none_or(|(r, _)| ratio > r) {
                best = Some((ratio, constraint));
            }
        }
        best.map(|(_, spec)| spec)
    }

    /// Shut a well after an economic-limit breach.
    pub fn shut_for_economics(&mut self, well: &mut WellState, breach: &EconomicBreach) -> bool {
        if well.is_shut() {
            return false;
        }
        warn!(well = %well.name, reason = %breach, "well shut on economic limit");
        well.set_control(ControlSpec::shut());
        true
    }

    /// Check every open producer against its economic limits and shut the
    /// ones in breach. Returns the names of the wells shut.
    pub fn apply_economic_limits(&mut self, wells: &mut [WellState]) -> Vec<String> {
        let mut shut = Vec::new();
        for well in wells.iter_mut() {
            if well.is_shut() || !well.kind.is_producer() || well.economic.is_empty() {
                continue;
            }
            if let Some(breach) = well.economic.check(&well.current_rates)
                && self.shut_for_economics(well, &breach)
            {
                shut.push(well.name.clone());
            }
        }
        shut
    }

    /// Apply one schedule event kind to one well. Returns whether the well
    /// changed.
    pub fn apply_to_well(&mut self, well: &mut WellState, kind: &EventKind) -> WellResult<bool> {
        match kind {
            EventKind::Shut | EventKind::EconomicShut => {
                if well.is_shut() {
                    return Ok(false);
                }
                info!(well = %well.name, "well shut by schedule");
                well.set_control(ControlSpec::shut());
                Ok(true)
            }
            EventKind::Open => {
                if !well.is_shut() {
                    return Ok(false);
                }
                info!(well = %well.name, mode = %well.configured.mode, "well reopened");
                well.set_control(well.configured);
                Ok(true)
            }
            EventKind::SetControl(spec) => {
                if spec.mode == ControlMode::Shut {
                    return self.apply_to_well(well, &EventKind::Shut);
                }
                validate_control(&well.name, well.kind, *spec)?;
                well.configured = *spec;
                if !well.is_shut() {
                    well.set_control(*spec);
                }
                Ok(true)
            }
            EventKind::SetLimits(limits) => {
                limits.validate()?;
                well.limits = *limits;
                Ok(true)
            }
            EventKind::SetEconomicLimits(economic) => {
                well.economic = *economic;
                Ok(true)
            }
        }
    }

    /// Apply a schedule event to every well it targets. Returns how many
    /// wells changed.
    ///
    /// Every targeted well is checked before any is touched, so a rejected
    /// event leaves all of them as they were.
    pub fn apply_event(&mut self, wells: &mut [WellState], event: &ScheduleEvent) -> WellResult<usize> {
        let targets: Vec<usize> = wells
            .iter()
            .enumerate()
            .filter(|(_, w)| event.target.matches(w))
            .map(|(i, _)| i)
            .collect();
        if targets.is_empty() {
            return Err(event.target.missing());
        }
        match &event.kind {
            EventKind::SetControl(spec) if spec.mode != ControlMode::Shut => {
                for &i in &targets {
                    validate_control(&wells[i].name, wells[i].kind, *spec)?;
                }
            }
            EventKind::SetLimits(limits) => limits.validate()?,
            _ => {}
        }

        let mut changed = 0;
        for i in targets {
            if self.apply_to_well(&mut wells[i], &event.kind)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::RatePhase;
    use crate::limits::{EconomicLimits, LimitSet, RateCaps};
    use crate::phase::{Phase, PhaseRates};
    use rf_core::WellId;

    fn producer() -> WellState {
        WellState::new(
            WellId::from_index(0),
            "P1",
            WellKind::Producer,
            ControlSpec::new(ControlMode::Rate(RatePhase::Oil), 100.0),
            LimitSet {
                min_bhp: Some(50.0),
                max_rates: RateCaps {
                    water: Some(40.0),
                    liquid: Some(150.0),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn rate_to_bhp_when_bhp_drops_below_minimum() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        let proposal = WellSolution::new(PhaseRates::new(100.0, 10.0, 0.0), 42.0);

        let decision = sm.evaluate(&mut well, &proposal, 1);

        assert_eq!(
            decision,
            ControlDecision::Switched {
                from: ControlMode::Rate(RatePhase::Oil),
                to: ControlSpec::new(ControlMode::Bhp, 50.0),
            }
        );
        assert_eq!(well.control_mode, ControlMode::Bhp);
        assert_eq!(well.target_value, 50.0);
    }

    #[test]
    fn bhp_to_rate_picks_most_violated_constraint() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        well.set_control(ControlSpec::new(ControlMode::Bhp, 50.0));

        // oil 120/100 = 1.2, water 60/40 = 1.5, liquid 180/150 = 1.2
        let proposal = WellSolution::new(PhaseRates::new(120.0, 60.0, 0.0), 50.0);
        let decision = sm.evaluate(&mut well, &proposal, 3);

        assert!(decision.switched());
        assert_eq!(well.control_mode, ControlMode::Rate(RatePhase::Water));
        assert_eq!(well.target_value, 40.0);
    }

    #[test]
    fn bhp_returns_to_configured_rate() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        well.set_control(ControlSpec::new(ControlMode::Bhp, 50.0));

        let proposal = WellSolution::new(PhaseRates::new(130.0, 5.0, 0.0), 50.0);
        sm.evaluate(&mut well, &proposal, 0);

        assert_eq!(well.active_control(), well.configured);
    }

    #[test]
    fn raised_minimum_moves_bhp_target() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        well.set_control(ControlSpec::new(ControlMode::Bhp, 50.0));
        let raised = LimitSet {
            min_bhp: Some(70.0),
            ..well.limits
        };
        sm.apply_to_well(&mut well, &EventKind::SetLimits(raised)).unwrap();

        let proposal = WellSolution::new(PhaseRates::new(90.0, 5.0, 0.0), 50.0);
        assert!(sm.evaluate(&mut well, &proposal, 0).switched());
        assert_eq!(well.active_control(), ControlSpec::new(ControlMode::Bhp, 70.0));
    }

    #[test]
    fn tighter_cap_on_controlled_phase_wins() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        let capped = LimitSet {
            max_rates: RateCaps {
                oil: Some(60.0),
                ..well.limits.max_rates
            },
            ..well.limits
        };
        sm.apply_to_well(&mut well, &EventKind::SetLimits(capped)).unwrap();

        let proposal = WellSolution::new(PhaseRates::new(100.0, 10.0, 0.0), 75.0);
        assert!(sm.evaluate(&mut well, &proposal, 1).switched());
        assert_eq!(
            well.active_control(),
            ControlSpec::new(ControlMode::Rate(RatePhase::Oil), 60.0)
        );

        // Held at the cap, the configured target is no longer exceeded.
        let held = WellSolution::new(PhaseRates::new(60.0, 6.0, 0.0), 80.0);
        assert_eq!(sm.evaluate(&mut well, &held, 2), ControlDecision::Unchanged);
    }

    #[test]
    fn lifted_cap_returns_to_configured_control() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        well.set_control(ControlSpec::new(ControlMode::Rate(RatePhase::Water), 40.0));
        let lifted = LimitSet {
            max_rates: RateCaps::default(),
            ..well.limits
        };
        sm.apply_to_well(&mut well, &EventKind::SetLimits(lifted)).unwrap();

        let proposal = WellSolution::new(PhaseRates::new(50.0, 40.0, 0.0), 75.0);
        assert!(sm.evaluate(&mut well, &proposal, 1).switched());
        assert_eq!(well.active_control(), well.configured);
    }

    #[test]
    fn feasible_proposal_leaves_well_unchanged() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        let proposal = WellSolution::new(PhaseRates::new(100.0, 10.0, 0.0), 75.0);
        assert_eq!(sm.evaluate(&mut well, &proposal, 0), ControlDecision::Unchanged);
        assert_eq!(well.control_mode, ControlMode::Rate(RatePhase::Oil));
    }

    #[test]
    fn at_most_one_switch_per_iteration() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        let low_bhp = WellSolution::new(PhaseRates::new(100.0, 10.0, 0.0), 42.0);
        assert!(sm.evaluate(&mut well, &low_bhp, 2).switched());

        // Under BHP the same iterate now breaks the water cap, but the well
        // already switched in iteration 2.
        let wet = WellSolution::new(PhaseRates::new(90.0, 80.0, 0.0), 50.0);
        assert_eq!(sm.evaluate(&mut well, &wet, 2), ControlDecision::Unchanged);
        assert!(sm.evaluate(&mut well, &wet, 3).switched());

        sm.reset();
        well.set_control(ControlSpec::new(ControlMode::Bhp, 50.0));
        assert!(sm.evaluate(&mut well, &wet, 3).switched());
    }

    #[test]
    fn shut_is_terminal_until_reopened() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer();
        assert!(sm.apply_to_well(&mut well, &EventKind::Shut).unwrap());
        assert!(well.is_shut());
        assert_eq!(well.current_rates, PhaseRates::ZERO);

        let crazy = WellSolution::new(PhaseRates::new(1e9, 1e9, 1e9), -1e9);
        assert_eq!(sm.evaluate(&mut well, &crazy, 0), ControlDecision::Unchanged);
        assert!(well.is_shut());

        assert!(sm.apply_to_well(&mut well, &EventKind::Open).unwrap());
        assert_eq!(well.active_control(), well.configured);
        assert!(!sm.apply_to_well(&mut well, &EventKind::Open).unwrap());
    }

    #[test]
    fn set_control_on_shut_well_only_changes_configuration() {
        let mut sm = WellControlStateMachine::default();
        let mut well = producer().initially_shut();
        let spec = ControlSpec::new(ControlMode::Rate(RatePhase::Liquid), 120.0);
        sm.apply_to_well(&mut well, &EventKind::SetControl(spec)).unwrap();
        assert!(well.is_shut());
        assert_eq!(well.configured, spec);
        sm.apply_to_well(&mut well, &EventKind::Open).unwrap();
        assert_eq!(well.active_control(), spec);
    }

    #[test]
    fn economic_breach_shuts_producer() {
        let mut sm = WellControlStateMachine::default();
        let mut wells = vec![producer().with_economic_limits(EconomicLimits {
            min_oil_rate: Some(5.0),
            max_water_cut: None,
        })];
        wells[0].record_solution(&WellSolution::new(PhaseRates::new(1.0, 3.0, 0.0), 60.0));

        let shut = sm.apply_economic_limits(&mut wells);

        assert_eq!(shut, vec!["P1".to_string()]);
        assert!(wells[0].is_shut());
    }

    #[test]
    fn rejected_group_event_changes_no_well() {
        let first = producer().with_group("pad");
        let injector = WellState::new(
            WellId::from_index(1),
            "I1",
            WellKind::Injector { phase: Phase::Water },
            ControlSpec::new(ControlMode::Rate(RatePhase::Water), 200.0),
            LimitSet::default(),
        )
        .unwrap()
        .with_group("pad");
        let mut wells = vec![first, injector];
        let before = wells.clone();

        let mut m = WellControlStateMachine::default();
        let event = ScheduleEvent::group(
            0.0,
            "pad",
            EventKind::SetControl(ControlSpec::new(ControlMode::Rate(RatePhase::Oil), 80.0)),
        );
        assert!(m.apply_event(&mut wells, &event).is_err());
        assert_eq!(wells, before);

        let bad_limits = ScheduleEvent::group(
            0.0,
            "pad",
            EventKind::SetLimits(LimitSet {
                min_bhp: Some(300.0),
                max_bhp: Some(100.0),
                ..Default::default()
            }),
        );
        assert!(m.apply_event(&mut wells, &bad_limits).is_err());
        assert_eq!(wells, before);
    }

    #[test]
    fn injector_switches_to_bhp_above_maximum() {
        let mut sm = WellControlStateMachine::default();
        let mut well = WellState::new(
            WellId::from_index(3),
            "I1",
            WellKind::Injector {
                phase: Phase::Water,
            },
            ControlSpec::new(ControlMode::Rate(RatePhase::Water), 500.0),
            LimitSet {
                max_bhp: Some(400.0),
                ..Default::default()
            },
        )
        .unwrap();
        let proposal = WellSolution::new(PhaseRates::new(0.0, 500.0, 0.0), 420.0);
        sm.evaluate(&mut well, &proposal, 0);
        assert_eq!(well.active_control(), ControlSpec::new(ControlMode::Bhp, 400.0));
    }
}
