//! Case validation logic.

use crate::schema::{
    Case, CellDef, ControlDef, ControlModeDef, EventActionDef, LimitsDef, PhaseDef,
    TimeSteppingDef, WellDef, WellKindDef,
};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn non_negative(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be non-negative"))
    }
}

pub fn validate_case(case: &Case) -> Result<(), ValidationError> {
    if case.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    if case.reservoir.cells.is_empty() {
        return Err(invalid("reservoir.cells", "[]", "at least one cell is required"));
    }
    let mut cell_ids = HashSet::new();
    for cell in &case.reservoir.cells {
        if !cell_ids.insert(cell.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: cell.id.clone(),
                context: "cells".to_string(),
            });
        }
        validate_cell(cell)?;
    }

    for conn in &case.reservoir.connections {
        for end in [&conn.from, &conn.to] {
            if !cell_ids.contains(end.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: end.clone(),
                    context: "connection".to_string(),
                });
            }
        }
        if conn.from == conn.to {
            return Err(invalid(
                format!("connection {}-{}", conn.from, conn.to),
                &conn.from,
                "a cell cannot connect to itself",
            ));
        }
        non_negative(
            format!("connection {}-{}.transmissibility_m3_per_day_bar", conn.from, conn.to),
            conn.transmissibility_m3_per_day_bar,
        )?;
    }

    let mut well_names = HashSet::new();
    let mut groups = HashSet::new();
    for well in &case.wells {
        if !well_names.insert(well.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: well.name.clone(),
                context: "wells".to_string(),
            });
        }
        if !cell_ids.contains(well.cell.as_str()) {
            return Err(ValidationError::MissingReference {
                id: well.cell.clone(),
                context: format!("well {} cell", well.name),
            });
        }
        if let Some(group) = &well.group {
            groups.insert(group.as_str());
        }
        validate_well(well)?;
    }

    if case.schedule.report_steps_days.is_empty() {
        return Err(invalid("schedule.report_steps_days", "[]", "at least one report step is required"));
    }
    for (i, d) in case.schedule.report_steps_days.iter().enumerate() {
        positive(format!("schedule.report_steps_days[{i}]"), *d)?;
    }

    for (i, event) in case.schedule.events.iter().enumerate() {
        let context = format!("schedule.events[{i}]");
        non_negative(format!("{context}.time_days"), event.time_days)?;
        match (&event.well, &event.group) {
            (Some(well), None) => {
                if !well_names.contains(well.as_str()) {
                    return Err(ValidationError::MissingReference {
                        id: well.clone(),
                        context,
                    });
                }
            }
            (None, Some(group)) => {
                if !groups.contains(group.as_str()) {
                    return Err(ValidationError::MissingReference {
                        id: group.clone(),
                        context,
                    });
                }
            }
            _ => {
                return Err(invalid(context, "well/group", "exactly one of well or group is required"));
            }
        }
        match &event.action {
            EventActionDef::SetControl(control) => {
                // Checked against every targeted well's kind.
                for well in case.wells.iter().filter(|w| {
                    event.well.as_deref() == Some(w.name.as_str())
                        || (event.group.is_some() && event.group == w.group)
                }) {
                    validate_control(&format!("{context}.action"), well, control)?;
                }
            }
            EventActionDef::SetLimits(limits) => validate_limits(&format!("{context}.action"), limits)?,
            EventActionDef::SetEconomic(_) | EventActionDef::Shut | EventActionDef::Open => {}
        }
    }

    validate_timestepping("timestepping", &case.timestepping)?;
    let mut previous = None;
    for (i, tuning) in case.schedule.tuning.iter().enumerate() {
        let context = format!("schedule.tuning[{i}]");
        if tuning.report_step >= case.schedule.report_steps_days.len() {
            return Err(invalid(
                format!("{context}.report_step"),
                tuning.report_step,
                "beyond the last report step",
            ));
        }
        if previous.is_some_and(|p| tuning.report_step <= p) {
            return Err(invalid(
                format!("{context}.report_step"),
                tuning.report_step,
                "tuning entries must be in increasing report step order",
            ));
        }
        previous = Some(tuning.report_step);
        validate_timestepping(&format!("{context}.timestepping"), &tuning.timestepping)?;
    }
    positive("newton.tolerance", case.newton.tolerance)?;
    positive("newton.switch_tolerance", case.newton.switch_tolerance)?;
    if case.newton.max_iterations == 0 {
        return Err(invalid("newton.max_iterations", 0, "must be at least 1"));
    }
    if !(case.newton.relaxation > 0.0 && case.newton.relaxation <= 1.0) {
        return Err(invalid("newton.relaxation", case.newton.relaxation, "must be in (0, 1]"));
    }
    if let Some(dp) = case.newton.max_pressure_change_bar {
        positive("newton.max_pressure_change_bar", dp)?;
    }
    Ok(())
}

fn validate_cell(cell: &CellDef) -> Result<(), ValidationError> {
    positive(format!("cell {}.pore_volume_m3", cell.id), cell.pore_volume_m3)?;
    positive(format!("cell {}.initial_pressure_bar", cell.id), cell.initial_pressure_bar)?;
    non_negative(format!("cell {}.compressibility_per_bar", cell.id), cell.compressibility_per_bar)?;
    if let Some(p) = cell.reference_pressure_bar {
        positive(format!("cell {}.reference_pressure_bar", cell.id), p)?;
    }
    Ok(())
}

fn validate_well(well: &WellDef) -> Result<(), ValidationError> {
    let ctx = format!("well {}", well.name);
    positive(format!("{ctx}.productivity_index_m3_per_day_bar"), well.productivity_index_m3_per_day_bar)?;
    validate_control(&ctx, well, &well.control)?;
    validate_limits(&ctx, &well.limits)?;

    if well.control.mode == ControlModeDef::GroupRate && well.group.is_none() {
        return Err(invalid(format!("{ctx}.group"), "none", "group_rate control needs a group"));
    }
    if let Some(cut) = well.economic.max_water_cut
        && !(0.0..=1.0).contains(&cut)
    {
        return Err(invalid(format!("{ctx}.economic.max_water_cut"), cut, "must be in [0, 1]"));
    }
    if let Some(q) = well.economic.min_oil_rate {
        non_negative(format!("{ctx}.economic.min_oil_rate"), q)?;
    }

    if well.kind == WellKindDef::Producer {
        let f = well.phase_fractions;
        for (name, v) in [("oil", f.oil), ("water", f.water), ("gas", f.gas)] {
            non_negative(format!("{ctx}.phase_fractions.{name}"), v)?;
        }
        let sum = f.oil + f.water + f.gas;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(invalid(format!("{ctx}.phase_fractions"), sum, "must sum to 1"));
        }
    }
    Ok(())
}

fn validate_control(ctx: &str, well: &WellDef, control: &ControlDef) -> Result<(), ValidationError> {
    let field = format!("{ctx}.control.target");
    if control.mode.is_rate() {
        non_negative(field, control.target)?;
    } else {
        positive(field, control.target)?;
    }
    if let WellKindDef::Injector { phase } = well.kind {
        let allowed = match control.mode {
            ControlModeDef::Bhp => true,
            ControlModeDef::OilRate => phase == PhaseDef::Oil,
            ControlModeDef::WaterRate | ControlModeDef::LiquidRate | ControlModeDef::GroupRate => {
                phase == PhaseDef::Water
            }
            ControlModeDef::GasRate => phase == PhaseDef::Gas,
        };
        if !allowed {
            return Err(ValidationError::Unsupported {
                feature: format!("{ctx}.control.mode = {:?}", control.mode),
                reason: "injectors are rate controlled on their injected phase".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_limits(ctx: &str, limits: &LimitsDef) -> Result<(), ValidationError> {
    for (name, value) in [
        ("min_bhp_bar", limits.min_bhp_bar),
        ("max_bhp_bar", limits.max_bhp_bar),
    ] {
        if let Some(v) = value {
            positive(format!("{ctx}.limits.{name}"), v)?;
        }
    }
    for (name, value) in [
        ("max_oil_rate", limits.max_oil_rate),
        ("max_water_rate", limits.max_water_rate),
        ("max_gas_rate", limits.max_gas_rate),
        ("max_liquid_rate", limits.max_liquid_rate),
    ] {
        if let Some(v) = value {
            non_negative(format!("{ctx}.limits.{name}"), v)?;
        }
    }
    if let (Some(lo), Some(hi)) = (limits.min_bhp_bar, limits.max_bhp_bar)
        && lo > hi
    {
        return Err(invalid(format!("{ctx}.limits"), lo, "min_bhp_bar exceeds max_bhp_bar"));
    }
    Ok(())
}

fn validate_timestepping(ctx: &str, ts: &TimeSteppingDef) -> Result<(), ValidationError> {
    positive(format!("{ctx}.initial_step_days"), ts.initial_step_days)?;
    positive(format!("{ctx}.min_step_days"), ts.min_step_days)?;
    positive(format!("{ctx}.max_step_days"), ts.max_step_days)?;
    positive(format!("{ctx}.growth_factor"), ts.growth_factor)?;
    positive(format!("{ctx}.decay_factor"), ts.decay_factor)?;
    positive(format!("{ctx}.max_growth"), ts.max_growth)?;
    positive(format!("{ctx}.growth_after_cut"), ts.growth_after_cut)?;
    if !(ts.cut_factor > 0.0 && ts.cut_factor < 1.0) {
        return Err(invalid(format!("{ctx}.cut_factor"), ts.cut_factor, "must be in (0, 1)"));
    }
    if ts.min_step_days > ts.max_step_days {
        return Err(invalid(format!("{ctx}.min_step_days"), ts.min_step_days, "exceeds max_step_days"));
    }
    if ts.fast_iterations >= ts.slow_iterations {
        return Err(invalid(
            format!("{ctx}.fast_iterations"),
            ts.fast_iterations,
            "must be below slow_iterations",
        ));
    }
    if let Some(dt) = ts.step_after_event_days {
        positive(format!("{ctx}.step_after_event_days"), dt)?;
    }
    Ok(())
}
