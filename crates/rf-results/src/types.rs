//! Result data types.
//!
//! Stored values use field units (days, bar, m³/day), like the case files.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub case_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub status: RunStatus,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Aborted by the time stepper; records up to `last_committed_days` are
    /// valid.
    Failed {
        reason: String,
        last_committed_days: f64,
    },
    Cancelled {
        last_committed_days: f64,
    },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub end_time_days: f64,
    pub report_steps: usize,
    pub substeps: usize,
    pub cuts: usize,
    pub newton_iterations: usize,
    pub linear_iterations: usize,
    pub well_switches: usize,
    /// Newton iterations spent in attempts that were cut.
    pub wasted_newton_iterations: usize,
    pub solver_time_s: f64,
}

/// State after one accepted substep. A run's first record, with zero
/// `dt_days`, holds the initial state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeseriesRecord {
    pub time_days: f64,
    pub dt_days: f64,
    pub report_step: usize,
    pub substep: usize,
    pub newton_iterations: usize,
    pub cuts: usize,
    /// Length the time stepper would try next.
    #[serde(default)]
    pub suggested_next_step_days: f64,
    pub cells: Vec<CellSnapshot>,
    pub wells: Vec<WellSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellSnapshot {
    pub cell_id: String,
    pub pressure_bar: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellSnapshot {
    pub name: String,
    /// Active control mode, e.g. `oil_rate`, `bhp`, `shut`.
    pub control: String,
    pub target: f64,
    pub oil_rate: f64,
    pub water_rate: f64,
    pub gas_rate: f64,
    pub bhp_bar: f64,
}
