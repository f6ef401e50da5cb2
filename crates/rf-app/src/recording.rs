//! Output sink that turns accepted substeps into stored timeseries records.

use std::time::Instant;

use rf_project::units::{pressure_bar, rate_m3_per_day, time_days};
use rf_results::{CellSnapshot, TimeseriesRecord, WellSnapshot};
use rf_sim::{OutputSink, SinkError, SubstepResult};
use rf_solver::ModelState;
use rf_wells::{ControlMode, PhaseRates, WellState};

use crate::progress::{RunProgressEvent, RunStage, StepProgress};

/// Collects one [`TimeseriesRecord`] per accepted substep, in field units,
/// after one for the initial state.
pub struct RecordingSink<'a, 'cb> {
    cell_ids: &'a [String],
    end_time: f64,
    records: Vec<TimeseriesRecord>,
    progress: Option<(&'a mut (dyn FnMut(RunProgressEvent) + 'cb), Instant)>,
}

impl<'a, 'cb> RecordingSink<'a, 'cb> {
    pub fn new(cell_ids: &'a [String], end_time: f64) -> Self {
        Self {
            cell_ids,
            end_time,
            records: Vec::new(),
            progress: None,
        }
    }

    /// Emit a `Simulating` progress event after every accepted substep.
    pub fn with_progress(
        mut self,
        cb: &'a mut (dyn FnMut(RunProgressEvent) + 'cb),
        started: Instant,
    ) -> Self {
        self.progress = Some((cb, started));
        self
    }

    pub fn records(&self) -> &[TimeseriesRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TimeseriesRecord> {
        self.records
    }
}

impl RecordingSink<'_, '_> {
    fn cell_snapshots(&self, state: &ModelState) -> Result<Vec<CellSnapshot>, SinkError> {
        state
            .unknowns
            .iter()
            .enumerate()
            .map(|(i, p)| -> Result<CellSnapshot, SinkError> {
                let cell_id = self
                    .cell_ids
                    .get(i)
                    .cloned()
                    .ok_or_else(|| SinkError::new(format!("no cell id for unknown {i}")))?;
                Ok(CellSnapshot {
                    cell_id,
                    pressure_bar: pressure_bar(*p),
                })
            })
            .collect()
    }
}

impl OutputSink for RecordingSink<'_, '_> {
    fn write_initial_state(&mut self, state: &ModelState) -> Result<(), SinkError> {
        let record = TimeseriesRecord {
            time_days: time_days(state.time),
            dt_days: 0.0,
            report_step: 0,
            substep: 0,
            newton_iterations: 0,
            cuts: 0,
            suggested_next_step_days: 0.0,
            cells: self.cell_snapshots(state)?,
            wells: state.wells.iter().map(well_snapshot).collect(),
        };
        self.records.push(record);
        Ok(())
    }

    fn write_time_step(&mut self, result: &SubstepResult<'_>) -> Result<(), SinkError> {
        let record = TimeseriesRecord {
            time_days: time_days(result.time),
            dt_days: time_days(result.length),
            report_step: result.report_step,
            substep: result.substep,
            newton_iterations: result.convergence.iteration_count,
            cuts: result.cuts,
            suggested_next_step_days: time_days(result.suggested_next_step),
            cells: self.cell_snapshots(result.state)?,
            wells: result.state.wells.iter().map(well_snapshot).collect(),
        };

        if let Some((cb, started)) = self.progress.as_mut() {
            let end_days = time_days(self.end_time);
            cb(RunProgressEvent {
                stage: RunStage::Simulating,
                elapsed_wall_s: started.elapsed().as_secs_f64(),
                message: None,
                step: Some(StepProgress {
                    sim_time_days: record.time_days,
                    end_time_days: end_days,
                    fraction_complete: if end_days > 0.0 {
                        (record.time_days / end_days).clamp(0.0, 1.0)
                    } else {
                        1.0
                    },
                    report_step: record.report_step,
                    substep: record.substep,
                    dt_days: record.dt_days,
                    newton_iterations: record.newton_iterations,
                    cuts: record.cuts,
                }),
            });
        }

        self.records.push(record);
        Ok(())
    }
}

fn well_snapshot(well: &WellState) -> WellSnapshot {
    let target = match well.control_mode {
        ControlMode::Bhp => pressure_bar(well.target_value),
        ControlMode::Shut => 0.0,
        ControlMode::Rate(_) | ControlMode::GroupRate => rate_m3_per_day(well.target_value),
    };
    let (rates, bhp) = if well.is_shut() {
        (PhaseRates::ZERO, 0.0)
    } else {
        (well.current_rates, pressure_bar(well.current_bhp))
    };
    WellSnapshot {
        name: well.name.clone(),
        control: well.control_mode.to_string(),
        target,
        oil_rate: rate_m3_per_day(rates.oil),
        water_rate: rate_m3_per_day(rates.water),
        gas_rate: rate_m3_per_day(rates.gas),
        bhp_bar: bhp,
    }
}
