//! Operating limits and economic limits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::control::RatePhase;
use crate::error::{WellError, WellResult};
use crate::phase::PhaseRates;

/// Optional maximum surface rates per phase.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateCaps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquid: Option<f64>,
}

impl RateCaps {
    pub fn get(&self, phase: RatePhase) -> Option<f64> {
        match phase {
            RatePhase::Oil => self.oil,
            RatePhase::Water => self.water,
            RatePhase::Gas => self.gas,
            RatePhase::Liquid => self.liquid,
        }
    }

    /// Configured caps in a fixed phase order.
    pub fn iter(&self) -> impl Iterator<Item = (RatePhase, f64)> + '_ {
        [
            RatePhase::Oil,
            RatePhase::Water,
            RatePhase::Gas,
            RatePhase::Liquid,
        ]
        .into_iter()
        .filter_map(|phase| self.get(phase).map(|cap| (phase, cap)))
    }
}

/// Physical limits a well must honour at the end of a converged step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LimitSet {
    /// Lowest BHP a producer may be drawn down to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bhp: Option<f64>,
    /// Highest BHP an injector may reach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bhp: Option<f64>,
    #[serde(default)]
    pub max_rates: RateCaps,
}

impl LimitSet {
    pub fn validate(&self) -> WellResult<()> {
        if let (Some(lo), Some(hi)) = (self.min_bhp, self.max_bhp)
            && lo > hi
        {
            return Err(WellError::InvalidArg {
                what: "min_bhp must not exceed max_bhp",
            });
        }
        for value in [self.min_bhp, self.max_bhp].into_iter().flatten() {
            if !value.is_finite() {
                return Err(WellError::InvalidArg {
                    what: "BHP limits must be finite",
                });
            }
        }
        for (_, cap) in self.max_rates.iter() {
            if !cap.is_finite() || cap < 0.0 {
                return Err(WellError::InvalidArg {
                    what: "rate caps must be finite and non-negative",
                });
            }
        }
        Ok(())
    }
}

/// A limit found violated by a proposed well solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    BhpBelowMin { bhp: f64, limit: f64 },
    BhpAboveMax { bhp: f64, limit: f64 },
    RateAboveMax { phase: RatePhase, rate: f64, limit: f64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::BhpBelowMin { bhp, limit } => {
                write!(f, "bhp {bhp:.6e} below minimum {limit:.6e}")
            }
            Violation::BhpAboveMax { bhp, limit } => {
                write!(f, "bhp {bhp:.6e} above maximum {limit:.6e}")
            }
            Violation::RateAboveMax { phase, rate, limit } => {
                write!(
                    f,
                    "{} rate {rate:.6e} above maximum {limit:.6e}",
                    phase.as_str()
                )
            }
        }
    }
}

/// Limits below which producing a well is no longer worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EconomicLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_oil_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_water_cut: Option<f64>,
}

/// Why a producer failed its economic limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EconomicBreach {
    OilRateBelowMin { rate: f64, limit: f64 },
    WaterCutAboveMax { water_cut: f64, limit: f64 },
}

impl fmt::Display for EconomicBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EconomicBreach::OilRateBelowMin { rate, limit } => {
                write!(f, "oil rate {rate:.6e} below economic minimum {limit:.6e}")
            }
            EconomicBreach::WaterCutAboveMax { water_cut, limit } => {
                write!(f, "water cut {water_cut:.4} above economic maximum {limit:.4}")
            }
        }
    }
}

impl EconomicLimits {
    pub fn is_empty(&self) -> bool {
        self.min_oil_rate.is_none() && self.max_water_cut.is_none()
    }

    /// Check producer rates against the limits.
    pub fn check(&self, rates: &PhaseRates) -> Option<EconomicBreach> {
        if let Some(limit) = self.min_oil_rate
            && rates.oil < limit
        {
            return Some(EconomicBreach::OilRateBelowMin {
                rate: rates.oil,
                limit,
            });
        }
        if let Some(limit) = self.max_water_cut {
            let water_cut = rates.water_cut();
            if water_cut > limit {
                return Some(EconomicBreach::WaterCutAboveMax { water_cut, limit });
            }
        }
        None
    }
}
