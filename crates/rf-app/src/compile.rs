//! Case compilation: field-unit case file to SI model, state and schedule.

use std::collections::HashMap;

use nalgebra::DVector;
use rf_core::{Tolerances, WellId};
use rf_project::units::{compressibility_per_pa, mobility_si, pressure_pa, rate_m3_per_s, time_s};
use rf_project::{
    Case, ControlDef, ControlModeDef, EconomicDef, EventActionDef, EventDef, LimitsDef, PhaseDef,
    TimeSteppingDef, WellKindDef,
};
use rf_sim::{ReportStep, TimeStepConfig};
use rf_solver::{ModelState, NewtonConfig};
use rf_wells::{
    ControlMode, ControlSpec, EconomicLimits, EventKind, EventTarget, LimitSet, Phase, PhaseRates,
    RateCaps, RatePhase, ScheduleEvent, SwitchConfig, WellKind, WellState,
};

use crate::error::{AppError, AppResult};
use crate::tank::{TankCell, TankConnection, TankModel, TankWell, injector_fractions};

/// Everything needed to run a case.
#[derive(Debug, Clone)]
pub struct CompiledCase {
    pub model: TankModel,
    pub initial_state: ModelState,
    pub report_steps: Vec<ReportStep>,
    pub newton: NewtonConfig,
    pub timestepping: TimeStepConfig,
    pub cell_ids: Vec<String>,
}

impl CompiledCase {
    pub fn end_time(&self) -> f64 {
        self.report_steps.last().map(ReportStep::end_time).unwrap_or(0.0)
    }
}

pub fn compile_case(case: &Case) -> AppResult<CompiledCase> {
    let cell_index: HashMap<&str, usize> = case
        .reservoir
        .cells
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();
    let lookup = |id: &str| {
        cell_index
            .get(id)
            .copied()
            .ok_or_else(|| AppError::Compile(format!("unknown cell '{id}'")))
    };

    let cells = case
        .reservoir
        .cells
        .iter()
        .map(|c| TankCell {
            pore_volume: c.pore_volume_m3,
            compressibility: compressibility_per_pa(c.compressibility_per_bar),
            reference_pressure: pressure_pa(c.reference_pressure_bar.unwrap_or(c.initial_pressure_bar)),
        })
        .collect();

    let mut connections = Vec::with_capacity(case.reservoir.connections.len());
    for conn in &case.reservoir.connections {
        connections.push(TankConnection {
            a: lookup(&conn.from)?,
            b: lookup(&conn.to)?,
            transmissibility: mobility_si(conn.transmissibility_m3_per_day_bar),
        });
    }

    let mut tank_wells = Vec::with_capacity(case.wells.len());
    let mut wells = Vec::with_capacity(case.wells.len());
    for (i, def) in case.wells.iter().enumerate() {
        let index = u32::try_from(i).map_err(|_| AppError::Compile("too many wells".to_string()))?;
        let kind = well_kind(def.kind);
        let fractions = match kind {
            WellKind::Producer => PhaseRates::new(
                def.phase_fractions.oil,
                def.phase_fractions.water,
                def.phase_fractions.gas,
            ),
            WellKind::Injector { phase } => injector_fractions(phase),
        };
        tank_wells.push(TankWell {
            cell: lookup(&def.cell)?,
            productivity_index: mobility_si(def.productivity_index_m3_per_day_bar),
            fractions,
        });

        let control = control_spec(&def.control, kind);
        let mut well = WellState::new(
            WellId::from_index(index),
            def.name.clone(),
            kind,
            control,
            limit_set(&def.limits),
        )?
        .with_economic_limits(economic_limits(&def.economic));
        // Reported in the initial state record, before any solve.
        well.current_bhp = match control.mode {
            ControlMode::Bhp => control.target,
            _ => case
                .reservoir
                .cells
                .iter()
                .find(|c| c.id == def.cell)
                .map(|c| pressure_pa(c.initial_pressure_bar))
                .unwrap_or(0.0),
        };
        if let Some(group) = &def.group {
            well = well.with_group(group.clone());
        }
        if def.initially_shut {
            well = well.initially_shut();
        }
        wells.push(well);
    }

    let pressures = DVector::from_iterator(
        case.reservoir.cells.len(),
        case.reservoir.cells.iter().map(|c| pressure_pa(c.initial_pressure_bar)),
    );
    let initial_state = ModelState::new(pressures, wells);

    let durations: Vec<f64> = case.schedule.report_steps_days.iter().map(|d| time_s(*d)).collect();
    let events = case
        .schedule
        .events
        .iter()
        .map(|e| schedule_event(e, &case.wells))
        .collect::<AppResult<Vec<_>>>()?;
    let mut report_steps = ReportStep::sequence(0.0, &durations, events);
    for tuning in &case.schedule.tuning {
        let step = report_steps.get_mut(tuning.report_step).ok_or_else(|| {
            AppError::Compile(format!("tuning for unknown report step {}", tuning.report_step))
        })?;
        step.time_stepping = Some(time_step_config(&tuning.timestepping)?);
    }

    let timestepping = time_step_config(&case.timestepping)?;

    let nd = &case.newton;
    let newton = NewtonConfig {
        max_iterations: nd.max_iterations,
        min_iterations: nd.min_iterations,
        tolerances: vec![nd.tolerance],
        relaxation: nd.relaxation,
        max_change: nd.max_pressure_change_bar.map(pressure_pa),
        min_value: None,
        switching: SwitchConfig {
            tolerance: Tolerances {
                abs: 1e-12,
                rel: nd.switch_tolerance,
            },
        },
    };
    newton.validate()?;

    Ok(CompiledCase {
        model: TankModel {
            cells,
            connections,
            wells: tank_wells,
        },
        initial_state,
        report_steps,
        newton,
        timestepping,
        cell_ids: case.reservoir.cells.iter().map(|c| c.id.clone()).collect(),
    })
}

fn time_step_config(ts: &TimeSteppingDef) -> AppResult<TimeStepConfig> {
    let config = TimeStepConfig {
        adaptive: ts.adaptive,
        initial_step: time_s(ts.initial_step_days),
        min_step: time_s(ts.min_step_days),
        max_step: time_s(ts.max_step_days),
        cut_factor: ts.cut_factor,
        max_cuts: ts.max_cuts,
        growth_factor: ts.growth_factor,
        decay_factor: ts.decay_factor,
        max_growth: ts.max_growth,
        fast_iterations: ts.fast_iterations,
        slow_iterations: ts.slow_iterations,
        growth_after_cut: ts.growth_after_cut,
        step_after_event: ts.step_after_event_days.map(time_s),
        ..Default::default()
    };
    config.validate()?;
    Ok(config)
}

fn phase(def: PhaseDef) -> Phase {
    match def {
        PhaseDef::Oil => Phase::Oil,
        PhaseDef::Water => Phase::Water,
        PhaseDef::Gas => Phase::Gas,
    }
}

fn well_kind(def: WellKindDef) -> WellKind {
    match def {
        WellKindDef::Producer => WellKind::Producer,
        WellKindDef::Injector { phase: p } => WellKind::Injector { phase: phase(p) },
    }
}

/// Control in SI: rate targets in m³/s, BHP in Pa.
fn control_spec(def: &ControlDef, kind: WellKind) -> ControlSpec {
    let mode = match def.mode {
        ControlModeDef::OilRate => ControlMode::Rate(RatePhase::Oil),
        ControlModeDef::WaterRate => ControlMode::Rate(RatePhase::Water),
        ControlModeDef::GasRate => ControlMode::Rate(RatePhase::Gas),
        ControlModeDef::LiquidRate => ControlMode::Rate(RatePhase::Liquid),
        ControlModeDef::GroupRate => ControlMode::GroupRate,
        ControlModeDef::Bhp => return ControlSpec::new(ControlMode::Bhp, pressure_pa(def.target)),
    };
    // Injected liquid is water.
    let mode = match (kind, mode) {
        (WellKind::Injector { phase: Phase::Water }, ControlMode::Rate(RatePhase::Liquid)) => {
            ControlMode::Rate(RatePhase::Water)
        }
        (_, mode) => mode,
    };
    ControlSpec::new(mode, rate_m3_per_s(def.target))
}

fn limit_set(def: &LimitsDef) -> LimitSet {
    LimitSet {
        min_bhp: def.min_bhp_bar.map(pressure_pa),
        max_bhp: def.max_bhp_bar.map(pressure_pa),
        max_rates: RateCaps {
            oil: def.max_oil_rate.map(rate_m3_per_s),
            water: def.max_water_rate.map(rate_m3_per_s),
            gas: def.max_gas_rate.map(rate_m3_per_s),
            liquid: def.max_liquid_rate.map(rate_m3_per_s),
        },
    }
}

fn economic_limits(def: &EconomicDef) -> EconomicLimits {
    EconomicLimits {
        min_oil_rate: def.min_oil_rate.map(rate_m3_per_s),
        max_water_cut: def.max_water_cut,
    }
}

fn schedule_event(def: &EventDef, wells: &[rf_project::WellDef]) -> AppResult<ScheduleEvent> {
    let target = match (&def.well, &def.group) {
        (Some(w), None) => EventTarget::Well(w.clone()),
        (None, Some(g)) => EventTarget::Group(g.clone()),
        _ => {
            return Err(AppError::Compile(
                "event needs exactly one of well or group".to_string(),
            ));
        }
    };
    let kind = match &def.action {
        EventActionDef::Shut => EventKind::Shut,
        EventActionDef::Open => EventKind::Open,
        EventActionDef::SetControl(control) => {
            // Group events share one target; the first member's kind decides
            // how an injector liquid-rate target is read.
            let member_kind = wells
                .iter()
                .find(|w| def.well.as_deref() == Some(w.name.as_str()) || (def.group.is_some() && def.group == w.group))
                .map(|w| well_kind(w.kind))
                .unwrap_or(WellKind::Producer);
            EventKind::SetControl(control_spec(control, member_kind))
        }
        EventActionDef::SetLimits(limits) => EventKind::SetLimits(limit_set(limits)),
        EventActionDef::SetEconomic(economic) => EventKind::SetEconomicLimits(economic_limits(economic)),
    };
    Ok(ScheduleEvent::new(time_s(def.time_days), target, kind))
}
