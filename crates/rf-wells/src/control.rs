//! Control modes and well kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phase::{Phase, PhaseRates};

/// Producer or injector. Injectors inject a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellKind {
    Producer,
    Injector { phase: Phase },
}

impl WellKind {
    pub fn is_producer(self) -> bool {
        matches!(self, WellKind::Producer)
    }
}

/// Phase selector for surface rate control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePhase {
    Oil,
    Water,
    Gas,
    Liquid,
}

impl RatePhase {
    /// Rate of the selected phase.
    pub fn rate(self, rates: &PhaseRates) -> f64 {
        match self {
            RatePhase::Oil => rates.oil,
            RatePhase::Water => rates.water,
            RatePhase::Gas => rates.gas,
            RatePhase::Liquid => rates.liquid(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RatePhase::Oil => "oil",
            RatePhase::Water => "water",
            RatePhase::Gas => "gas",
            RatePhase::Liquid => "liquid",
        }
    }
}

impl From<Phase> for RatePhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Oil => RatePhase::Oil,
            Phase::Water => RatePhase::Water,
            Phase::Gas => RatePhase::Gas,
        }
    }
}

/// The constraint currently governing a well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Surface rate target on one phase.
    Rate(RatePhase),
    /// Bottomhole pressure target.
    Bhp,
    /// Liquid rate allocated by the well's group.
    GroupRate,
    Shut,
}

impl ControlMode {
    /// The rate this mode constrains, if it is a rate mode.
    pub fn rate_phase(self) -> Option<RatePhase> {
        match self {
            ControlMode::Rate(phase) => Some(phase),
            ControlMode::GroupRate => Some(RatePhase::Liquid),
            ControlMode::Bhp | ControlMode::Shut => None,
        }
    }

    pub fn is_rate(self) -> bool {
        self.rate_phase().is_some()
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Rate(phase) => write!(f, "{}_rate", phase.as_str()),
            ControlMode::Bhp => write!(f, "bhp"),
            ControlMode::GroupRate => write!(f, "group_rate"),
            ControlMode::Shut => write!(f, "shut"),
        }
    }
}

/// A control mode together with its target value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub mode: ControlMode,
    pub target: f64,
}

impl ControlSpec {
    pub fn new(mode: ControlMode, target: f64) -> Self {
        Self { mode, target }
    }

    pub fn shut() -> Self {
        Self {
            mode: ControlMode::Shut,
            target: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_rate_constrains_liquid() {
        assert_eq!(ControlMode::GroupRate.rate_phase(), Some(RatePhase::Liquid));
        assert_eq!(ControlMode::Bhp.rate_phase(), None);
        assert!(!ControlMode::Shut.is_rate());
    }

    #[test]
    fn display_names() {
        assert_eq!(ControlMode::Rate(RatePhase::Oil).to_string(), "oil_rate");
        assert_eq!(ControlMode::GroupRate.to_string(), "group_rate");
        assert_eq!(ControlMode::Bhp.to_string(), "bhp");
    }

    #[test]
    fn rate_phase_selects_rate() {
        let q = PhaseRates::new(10.0, 5.0, 100.0);
        assert_eq!(RatePhase::Liquid.rate(&q), 15.0);
        assert_eq!(RatePhase::from(Phase::Gas).rate(&q), 100.0);
    }
}
