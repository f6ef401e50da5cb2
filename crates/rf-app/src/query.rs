//! Query helpers for extracting data from loaded runs.

use std::fmt::Write as _;

use rf_results::{TimeseriesRecord, WellSnapshot};

use crate::error::{AppError, AppResult};

/// Shape of a run's stored data.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDataSummary {
    pub time_range_days: (f64, f64),
    pub record_count: usize,
    pub report_steps: usize,
    pub cell_count: usize,
    pub well_count: usize,
}

/// Cumulative surface volumes of one well, m³.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CumulativeVolumes {
    pub oil: f64,
    pub water: f64,
    pub gas: f64,
}

pub fn get_run_summary(records: &[TimeseriesRecord]) -> AppResult<RunDataSummary> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    };
    Ok(RunDataSummary {
        time_range_days: (first.time_days - first.dt_days, last.time_days),
        record_count: records.len(),
        report_steps: last.report_step + 1 - first.report_step,
        cell_count: first.cells.len(),
        well_count: first.wells.len(),
    })
}

pub fn list_cell_ids(records: &[TimeseriesRecord]) -> Vec<String> {
    records
        .first()
        .map(|r| r.cells.iter().map(|c| c.cell_id.clone()).collect())
        .unwrap_or_default()
}

pub fn list_well_names(records: &[TimeseriesRecord]) -> Vec<String> {
    records
        .first()
        .map(|r| r.wells.iter().map(|w| w.name.clone()).collect())
        .unwrap_or_default()
}

fn find_well<'a>(record: &'a TimeseriesRecord, name: &str) -> Option<&'a WellSnapshot> {
    record.wells.iter().find(|w| w.name == name)
}

/// Extract `(time_days, value)` pairs for a well variable.
///
/// Variables: `oil_rate`, `water_rate`, `gas_rate`, `liquid_rate` (m³/day),
/// `water_cut`, `bhp` (bar) and `target` (unit of the active control).
pub fn extract_well_series(
    records: &[TimeseriesRecord],
    well: &str,
    variable: &str,
) -> AppResult<Vec<(f64, f64)>> {
    let mut series = Vec::with_capacity(records.len());
    for record in records {
        let Some(w) = find_well(record, well) else {
            continue;
        };
        let value = match variable {
            "oil_rate" => w.oil_rate,
            "water_rate" => w.water_rate,
            "gas_rate" => w.gas_rate,
            "liquid_rate" => w.oil_rate + w.water_rate,
            "water_cut" => {
                let liquid = w.oil_rate + w.water_rate;
                if liquid > 0.0 { w.water_rate / liquid } else { 0.0 }
            }
            "bhp" | "bhp_bar" => w.bhp_bar,
            "target" => w.target,
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "Unknown well variable: {variable}"
                )));
            }
        };
        series.push((record.time_days, value));
    }

    if series.is_empty() && !records.is_empty() {
        return Err(AppError::InvalidInput(format!("Well not found: {well}")));
    }
    Ok(series)
}

pub fn extract_cell_series(
    records: &[TimeseriesRecord],
    cell_id: &str,
    variable: &str,
) -> AppResult<Vec<(f64, f64)>> {
    if !matches!(variable, "pressure" | "pressure_bar") {
        return Err(AppError::InvalidInput(format!(
            "Unknown cell variable: {variable}"
        )));
    }
    let series: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|r| {
            r.cells
                .iter()
                .find(|c| c.cell_id == cell_id)
                .map(|c| (r.time_days, c.pressure_bar))
        })
        .collect();

    if series.is_empty() && !records.is_empty() {
        return Err(AppError::InvalidInput(format!("Cell not found: {cell_id}")));
    }
    Ok(series)
}

/// Control mode changes of a well between recorded substeps, starting with
/// the mode of the first record.
pub fn well_control_history(records: &[TimeseriesRecord], well: &str) -> Vec<(f64, String)> {
    let mut history: Vec<(f64, String)> = Vec::new();
    for record in records {
        if let Some(w) = find_well(record, well)
            && history.last().is_none_or(|(_, mode)| *mode != w.control)
        {
            history.push((record.time_days, w.control.clone()));
        }
    }
    history
}

/// Rates are constant over each implicit substep, so volumes are rate times
/// substep length.
pub fn cumulative_volumes(records: &[TimeseriesRecord], well: &str) -> CumulativeVolumes {
    records
        .iter()
        .filter_map(|r| find_well(r, well).map(|w| (r.dt_days, w)))
        .fold(CumulativeVolumes::default(), |mut acc, (dt, w)| {
            acc.oil += w.oil_rate * dt;
            acc.water += w.water_rate * dt;
            acc.gas += w.gas_rate * dt;
            acc
        })
}

/// Render a series as two-column CSV.
pub fn series_to_csv(series: &[(f64, f64)], value_header: &str) -> String {
    let mut out = format!("time_days,{value_header}\n");
    for (t, v) in series {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{t},{v}");
    }
    out
}
