//! Multi-cell tank material balance.
//!
//! Each cell is a lumped pore volume at a single pressure. Cells exchange
//! fluid through transmissibilities and wells draw from (or inject into) the
//! cell they are completed in through a productivity index. The fluid is a
//! single pseudo-phase whose surface split is fixed per producer, so the
//! unknowns are the cell pressures alone. All quantities are SI.
//!
//! Residual of cell `i`, scaled to a pore-volume fraction:
//!
//! ```text
//! R_i = [V_i(p_i) - V_i(p_i^n) + dt (sum_j T_ij (p_i - p_j) + sum_w q_w)] / V0_i
//! V_i(p) = V0_i (1 + c_i (p - p_ref,i))
//! ```

use nalgebra::DVector;
use rf_solver::{Assembler, Linearization, ModelState, SolverResult, finite_difference_jacobian};
use rf_wells::{ControlMode, Phase, PhaseRates, RatePhase, WellKind, WellSolution, WellState};

const FD_STEP: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
pub struct TankCell {
    pub pore_volume: f64,
    pub compressibility: f64,
    pub reference_pressure: f64,
}

impl TankCell {
    fn pore_volume_at(&self, p: f64) -> f64 {
        self.pore_volume * (1.0 + self.compressibility * (p - self.reference_pressure))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankConnection {
    pub a: usize,
    pub b: usize,
    pub transmissibility: f64,
}

/// Completion data of one well, indexed by the well's id slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankWell {
    pub cell: usize,
    pub productivity_index: f64,
    /// Surface split of produced fluid; unused for injectors.
    pub fractions: PhaseRates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankModel {
    pub cells: Vec<TankCell>,
    pub connections: Vec<TankConnection>,
    pub wells: Vec<TankWell>,
}

impl TankModel {
    /// Signed volumetric rate of `well` out of its cell (injection negative)
    /// and its BHP, at cell pressure `p`.
    fn well_flow(&self, well: &WellState, p: f64) -> (f64, f64) {
        let Some(completion) = self.wells.get(well.id.slot()) else {
            return (0.0, p);
        };
        let pi = completion.productivity_index;
        match well.kind {
            WellKind::Producer => {
                let total = match well.control_mode {
                    ControlMode::Shut => return (0.0, p),
                    ControlMode::Bhp => return ((pi * (p - well.target_value)).max(0.0), well.target_value),
                    ControlMode::Rate(phase) => rate_to_total(well.target_value, phase, &completion.fractions),
                    ControlMode::GroupRate => {
                        rate_to_total(well.target_value, RatePhase::Liquid, &completion.fractions)
                    }
                };
                (total, p - total / pi)
            }
            WellKind::Injector { .. } => {
                let injected = match well.control_mode {
                    ControlMode::Shut => return (0.0, p),
                    ControlMode::Bhp => return (-(pi * (well.target_value - p)).max(0.0), well.target_value),
                    ControlMode::Rate(_) | ControlMode::GroupRate => well.target_value,
                };
                (-injected, p + injected / pi)
            }
        }
    }

    pub fn residual(
        &self,
        pressures: &DVector<f64>,
        previous: &DVector<f64>,
        wells: &[WellState],
        dt: f64,
    ) -> DVector<f64> {
        let mut r = DVector::zeros(self.cells.len());
        for (i, cell) in self.cells.iter().enumerate() {
            r[i] = cell.pore_volume_at(pressures[i]) - cell.pore_volume_at(previous[i]);
        }
        for c in &self.connections {
            let flow = dt * c.transmissibility * (pressures[c.a] - pressures[c.b]);
            r[c.a] += flow;
            r[c.b] -= flow;
        }
        for well in wells {
            if let Some(completion) = self.wells.get(well.id.slot()) {
                let (q, _) = self.well_flow(well, pressures[completion.cell]);
                r[completion.cell] += dt * q;
            }
        }
        for (i, cell) in self.cells.iter().enumerate() {
            r[i] /= cell.pore_volume;
        }
        r
    }
}

/// Total reservoir rate that delivers `target` on `phase`. A well that
/// produces none of the phase cannot meet the target and flows nothing.
fn rate_to_total(target: f64, phase: RatePhase, fractions: &PhaseRates) -> f64 {
    let share = phase.rate(fractions);
    if share > 0.0 { target / share } else { 0.0 }
}

impl Assembler for TankModel {
    fn assemble(&self, state: &ModelState, dt: f64) -> SolverResult<Linearization> {
        let residual = self.residual(&state.unknowns, &state.previous, &state.wells, dt);
        let jacobian = finite_difference_jacobian(
            &state.unknowns,
            &residual,
            |p| Ok(self.residual(p, &state.previous, &state.wells, dt)),
            FD_STEP,
        )?;
        Ok(Linearization { residual, jacobian })
    }

    fn well_solution(&self, state: &ModelState, well: &WellState) -> WellSolution {
        let Some(completion) = self.wells.get(well.id.slot()) else {
            return WellSolution::new(PhaseRates::ZERO, 0.0);
        };
        let p = state.unknowns[completion.cell];
        let (q, bhp) = self.well_flow(well, p);
        let rates = match well.kind {
            WellKind::Producer => completion.fractions.scaled(q),
            WellKind::Injector { phase } => {
                let mut rates = PhaseRates::ZERO;
                rates.set(phase, -q);
                rates
            }
        };
        WellSolution::new(rates, bhp)
    }
}

/// Surface split used for an injector's reported rates.
pub fn injector_fractions(phase: Phase) -> PhaseRates {
    let mut f = PhaseRates::ZERO;
    f.set(phase, 1.0);
    f
}
