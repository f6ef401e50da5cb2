//! Case file schema.
//!
//! Values are in field units: pressures in bar, volumes in m³, surface rates
//! in m³/day, times in days. [`crate::units`] converts them to SI.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub version: u32,
    pub name: String,
    pub reservoir: ReservoirDef,
    #[serde(default)]
    pub wells: Vec<WellDef>,
    pub schedule: ScheduleDef,
    #[serde(default)]
    pub timestepping: TimeSteppingDef,
    #[serde(default)]
    pub newton: NewtonDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservoirDef {
    pub cells: Vec<CellDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

/// A tank cell: lumped pore volume at one pressure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellDef {
    pub id: String,
    pub pore_volume_m3: f64,
    pub initial_pressure_bar: f64,
    /// Total (rock + fluid) compressibility.
    pub compressibility_per_bar: f64,
    /// Pressure at which `pore_volume_m3` applies; defaults to the initial
    /// pressure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_pressure_bar: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
    pub transmissibility_m3_per_day_bar: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseDef {
    Oil,
    Water,
    Gas,
}

/// Written as `{ type: producer }` or `{ type: injector, phase: water }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WellKindDef {
    Producer,
    Injector { phase: PhaseDef },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlModeDef {
    OilRate,
    WaterRate,
    GasRate,
    LiquidRate,
    Bhp,
    GroupRate,
}

impl ControlModeDef {
    pub fn is_rate(self) -> bool {
        !matches!(self, ControlModeDef::Bhp)
    }
}

/// Control mode and its target: m³/day for rate modes, bar for BHP.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ControlDef {
    pub mode: ControlModeDef,
    pub target: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LimitsDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bhp_bar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bhp_bar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_oil_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_water_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gas_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_liquid_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EconomicDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_oil_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_water_cut: Option<f64>,
}

/// Surface volume split of produced reservoir fluid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhaseFractionsDef {
    #[serde(default)]
    pub oil: f64,
    #[serde(default)]
    pub water: f64,
    #[serde(default)]
    pub gas: f64,
}

impl Default for PhaseFractionsDef {
    fn default() -> Self {
        Self {
            oil: 1.0,
            water: 0.0,
            gas: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellDef {
    pub name: String,
    pub cell: String,
    pub kind: WellKindDef,
    pub productivity_index_m3_per_day_bar: f64,
    pub control: ControlDef,
    #[serde(default)]
    pub limits: LimitsDef,
    #[serde(default)]
    pub economic: EconomicDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub phase_fractions: PhaseFractionsDef,
    #[serde(default)]
    pub initially_shut: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub report_steps_days: Vec<f64>,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tuning: Vec<TuningDef>,
}

impl ScheduleDef {
    pub fn total_days(&self) -> f64 {
        self.report_steps_days.iter().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDef {
    pub time_days: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub action: EventActionDef,
}

/// Time stepping policy taking effect at the start of `report_step` and
/// holding until the next tuning entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TuningDef {
    pub report_step: usize,
    pub timestepping: TimeSteppingDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventActionDef {
    Shut,
    Open,
    SetControl(ControlDef),
    SetLimits(LimitsDef),
    SetEconomic(EconomicDef),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeSteppingDef {
    /// Off: each report step is one substep (split at events) and a failed
    /// solve ends the run.
    pub adaptive: bool,
    pub initial_step_days: f64,
    pub min_step_days: f64,
    pub max_step_days: f64,
    pub cut_factor: f64,
    pub max_cuts: usize,
    pub growth_factor: f64,
    pub decay_factor: f64,
    pub max_growth: f64,
    pub fast_iterations: usize,
    pub slow_iterations: usize,
    pub growth_after_cut: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_after_event_days: Option<f64>,
}

impl Default for TimeSteppingDef {
    fn default() -> Self {
        Self {
            adaptive: true,
            initial_step_days: 1.0,
            min_step_days: 1e-12,
            max_step_days: 365.0,
            cut_factor: 0.33,
            max_cuts: 10,
            growth_factor: 2.0,
            decay_factor: 0.75,
            max_growth: 3.0,
            fast_iterations: 5,
            slow_iterations: 15,
            growth_after_cut: 1.0,
            step_after_event_days: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewtonDef {
    pub max_iterations: usize,
    pub min_iterations: usize,
    /// Tolerance on the largest cell material-balance error, as a fraction
    /// of the cell pore volume.
    pub tolerance: f64,
    pub relaxation: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pressure_change_bar: Option<f64>,
    /// Relative band around a well limit inside which no switch happens.
    pub switch_tolerance: f64,
}

impl Default for NewtonDef {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            min_iterations: 1,
            tolerance: 1e-7,
            relaxation: 1.0,
            max_pressure_change_bar: None,
            switch_tolerance: 1e-6,
        }
    }
}
