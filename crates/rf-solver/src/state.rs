//! Mutable model state and the snapshot/restore contract.

use nalgebra::DVector;
use rf_wells::WellState;

/// Everything a nonlinear solve mutates.
///
/// `unknowns` is the current iterate; `previous` holds the unknowns at the
/// last committed time and is what accumulation terms are measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    pub time: f64,
    pub unknowns: DVector<f64>,
    pub previous: DVector<f64>,
    pub wells: Vec<WellState>,
}

/// Value copy of a [`ModelState`], taken before a trial substep.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(ModelState);

impl Snapshot {
    pub fn time(&self) -> f64 {
        self.0.time
    }

    pub fn state(&self) -> &ModelState {
        &self.0
    }
}

impl ModelState {
    pub fn new(unknowns: DVector<f64>, wells: Vec<WellState>) -> Self {
        Self {
            time: 0.0,
            previous: unknowns.clone(),
            unknowns,
            wells,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.clone())
    }

    /// Revert every field to `snapshot`, bit for bit.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.clone_from(&snapshot.0);
    }

    /// Accept the current iterate as the new baseline at `time + dt`.
    pub fn commit(&mut self, dt: f64) {
        self.previous.copy_from(&self.unknowns);
        self.time += dt;
    }

    pub fn well(&self, name: &str) -> Option<&WellState> {
        self.wells.iter().find(|w| w.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::WellId;
    use rf_wells::{ControlMode, ControlSpec, LimitSet, RatePhase, WellKind};

    fn state() -> ModelState {
        let well = WellState::new(
            WellId::from_index(0),
            "P1",
            WellKind::Producer,
            ControlSpec::new(ControlMode::Rate(RatePhase::Oil), 10.0),
            LimitSet::default(),
        )
        .unwrap();
        ModelState::new(DVector::from_vec(vec![200.0, 190.0]), vec![well])
    }

    #[test]
    fn restore_is_exact() {
        let mut s = state();
        let snap = s.snapshot();
        s.unknowns[0] = 1.0 / 3.0;
        s.time = 5.0;
        s.wells[0].control_mode = ControlMode::Bhp;
        s.wells[0].target_value = 50.0;
        s.restore(&snap);
        assert_eq!(&s, snap.state());
        assert_eq!(s.unknowns[0].to_bits(), 200.0f64.to_bits());
    }

    #[test]
    fn commit_moves_baseline() {
        let mut s = state();
        s.unknowns[1] = 150.0;
        s.commit(2.5);
        assert_eq!(s.previous, s.unknowns);
        assert_eq!(s.time, 2.5);
    }
}
