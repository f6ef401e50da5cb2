//! Fluid phases and per-phase surface rates.

use serde::{Deserialize, Serialize};

/// Fluid phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Oil,
    Water,
    Gas,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Oil, Phase::Water, Phase::Gas];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Oil => "oil",
            Phase::Water => "water",
            Phase::Gas => "gas",
        }
    }
}

/// Surface volume rates per phase. Magnitudes are non-negative for both
/// producers and injectors; the well kind tells the direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseRates {
    pub oil: f64,
    pub water: f64,
    pub gas: f64,
}

impl PhaseRates {
    pub const ZERO: PhaseRates = PhaseRates {
        oil: 0.0,
        water: 0.0,
        gas: 0.0,
    };

    pub fn new(oil: f64, water: f64, gas: f64) -> Self {
        Self { oil, water, gas }
    }

    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Oil => self.oil,
            Phase::Water => self.water,
            Phase::Gas => self.gas,
        }
    }

    pub fn set(&mut self, phase: Phase, value: f64) {
        match phase {
            Phase::Oil => self.oil = value,
            Phase::Water => self.water = value,
            Phase::Gas => self.gas = value,
        }
    }

    /// Oil plus water.
    pub fn liquid(&self) -> f64 {
        self.oil + self.water
    }

    /// Water fraction of the liquid rate; zero when nothing flows.
    pub fn water_cut(&self) -> f64 {
        let liquid = self.liquid();
        if liquid > 0.0 { self.water / liquid } else { 0.0 }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            oil: self.oil * factor,
            water: self.water * factor,
            gas: self.gas * factor,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.oil.is_finite() && self.water.is_finite() && self.gas.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liquid_and_water_cut() {
        let q = PhaseRates::new(30.0, 10.0, 500.0);
        assert_eq!(q.liquid(), 40.0);
        assert!((q.water_cut() - 0.25).abs() < 1e-12);
        assert_eq!(PhaseRates::ZERO.water_cut(), 0.0);
    }

    #[test]
    fn get_set_by_phase() {
        let mut q = PhaseRates::ZERO;
        for (i, phase) in Phase::ALL.into_iter().enumerate() {
            q.set(phase, i as f64 + 1.0);
        }
        assert_eq!(q, PhaseRates::new(1.0, 2.0, 3.0));
        assert_eq!(q.scaled(2.0).get(Phase::Gas), 6.0);
    }
}
