//! Schedule events acting on wells.

use serde::{Deserialize, Serialize};

use crate::control::ControlSpec;
use crate::error::WellError;
use crate::limits::{EconomicLimits, LimitSet};
use crate::state::WellState;

/// Which wells an event applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTarget {
    Well(String),
    Group(String),
}

impl EventTarget {
    pub fn matches(&self, well: &WellState) -> bool {
        match self {
            EventTarget::Well(name) => well.name == *name,
            EventTarget::Group(name) => well.group.as_deref() == Some(name.as_str()),
        }
    }

    pub(crate) fn missing(&self) -> WellError {
        match self {
            EventTarget::Well(name) => WellError::UnknownWell { name: name.clone() },
            EventTarget::Group(name) => WellError::UnknownGroup { name: name.clone() },
        }
    }
}

/// What an event does to its target wells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Shut,
    Open,
    /// Replace the configured control. Open wells switch immediately; shut
    /// wells pick it up when reopened.
    SetControl(ControlSpec),
    SetLimits(LimitSet),
    SetEconomicLimits(EconomicLimits),
    /// Shut raised by the economic-limit check rather than the schedule.
    EconomicShut,
}

/// An event scheduled at an absolute simulation time (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub time: f64,
    pub target: EventTarget,
    pub kind: EventKind,
}

impl ScheduleEvent {
    pub fn new(time: f64, target: EventTarget, kind: EventKind) -> Self {
        Self { time, target, kind }
    }

    pub fn well(time: f64, name: impl Into<String>, kind: EventKind) -> Self {
        Self::new(time, EventTarget::Well(name.into()), kind)
    }

    pub fn group(time: f64, name: impl Into<String>, kind: EventKind) -> Self {
        Self::new(time, EventTarget::Group(name.into()), kind)
    }
}
