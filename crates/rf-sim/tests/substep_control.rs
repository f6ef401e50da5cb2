//! Report step driver scenarios on a scripted model.

use std::cell::Cell;

use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use rf_core::WellId;
use rf_sim::{
    AbortReason, CancelToken, FailureAccumulator, NullSink, OutputSink, ReportStep,
    ReportStepDriver, SimError, SinkError, StepReport, SubstepController, SubstepResult,
    TimeStepConfig,
};
use rf_solver::{Assembler, Linearization, ModelState, NewtonConfig, NonlinearSolver, SolverResult};
use rf_wells::{
    ControlMode, ControlSpec, EconomicLimits, EventKind, LimitSet, PhaseRates, RatePhase,
    ScheduleEvent, WellKind, WellSolution, WellState,
};

/// `x' = 1`, solvable in one Newton iteration for any step up to
/// `max_solvable`. Longer steps stall on a constant residual until the
/// iteration ceiling.
struct Scripted {
    max_solvable: f64,
    assemblies: Cell<usize>,
}

impl Scripted {
    fn new(max_solvable: f64) -> Self {
        Self {
            max_solvable,
            assemblies: Cell::new(0),
        }
    }
}

impl Assembler for Scripted {
    fn assemble(&self, state: &ModelState, dt: f64) -> SolverResult<Linearization> {
        self.assemblies.set(self.assemblies.get() + 1);
        let residual = if dt > self.max_solvable {
            1.0
        } else {
            state.unknowns[0] - state.previous[0] - dt
        };
        Ok(Linearization {
            residual: DVector::from_element(1, residual),
            jacobian: DMatrix::from_element(1, 1, if dt > self.max_solvable { 0.5 } else { 1.0 }),
        })
    }

    fn well_solution(&self, state: &ModelState, well: &WellState) -> WellSolution {
        let q = if well.is_shut() { 0.0 } else { 1.0 };
        WellSolution::new(PhaseRates::new(q, 0.0, 0.0), state.unknowns[0])
    }
}

fn driver(config: TimeStepConfig) -> ReportStepDriver {
    let newton = NewtonConfig {
        max_iterations: 8,
        ..Default::default()
    };
    ReportStepDriver::new(
        NonlinearSolver::dense(newton).unwrap(),
        SubstepController::new(config).unwrap(),
    )
}

fn config(initial: f64) -> TimeStepConfig {
    TimeStepConfig {
        initial_step: initial,
        min_step: 1e-9,
        max_step: 1e6,
        cut_factor: 0.5,
        ..Default::default()
    }
}

fn state() -> ModelState {
    let well = WellState::new(
        WellId::from_index(0),
        "P1",
        WellKind::Producer,
        ControlSpec::new(ControlMode::Rate(RatePhase::Oil), 1.0),
        LimitSet::default(),
    )
    .unwrap();
    ModelState::new(DVector::from_element(1, 0.0), vec![well])
}

#[derive(Default)]
struct Recorder {
    lengths: Vec<f64>,
    suggestions: Vec<f64>,
    /// Control and oil rate of the first well per substep.
    wells: Vec<(String, f64)>,
    initial_writes: usize,
    reports: usize,
    fail_writes: bool,
}

impl OutputSink for Recorder {
    fn write_initial_state(&mut self, state: &ModelState) -> Result<(), SinkError> {
        assert_eq!(state.time, 0.0);
        self.initial_writes += 1;
        Ok(())
    }

    fn write_time_step(&mut self, result: &SubstepResult<'_>) -> Result<(), SinkError> {
        self.lengths.push(result.length);
        self.suggestions.push(result.suggested_next_step);
        let well = &result.state.wells[0];
        self.wells
            .push((well.control_mode.to_string(), well.current_rates.oil));
        if self.fail_writes {
            return Err(SinkError::new("disk full"));
        }
        Ok(())
    }

    fn end_report_step(&mut self, _report: &StepReport) -> Result<(), SinkError> {
        self.reports += 1;
        Ok(())
    }
}

#[test]
fn one_cut_then_two_halves() {
    let mut d = driver(config(30.0));
    let mut s = state();
    let mut failures = FailureAccumulator::default();
    let mut sink = Recorder::default();

    let report = d
        .run(&ReportStep::new(0, 0.0, 30.0), &Scripted::new(20.0), &mut s, &mut sink, &mut failures)
        .unwrap();

    assert_eq!(report.accepted_lengths(), vec![15.0, 15.0]);
    assert_eq!(report.cuts, 1);
    assert_eq!(failures.substep_cuts, 1);
    assert_eq!(failures.failed_attempts, 1);
    assert_eq!(failures.nonlinear_iterations_total, 8);
    assert_eq!(s.time, 30.0);
    assert!((s.unknowns[0] - 30.0).abs() < 1e-12);
    assert_eq!(sink.lengths, vec![15.0, 15.0]);
    assert_eq!(sink.reports, 1);
}

#[test]
fn abort_after_ten_cuts_keeps_committed_state() {
    let mut d = driver(config(30.0));
    let mut s = state();
    let before = s.clone();
    let mut failures = FailureAccumulator::default();

    let err = d
        .run(&ReportStep::new(0, 0.0, 30.0), &Scripted::new(0.0), &mut s, &mut NullSink, &mut failures)
        .unwrap_err();

    match &err {
        SimError::Aborted {
            reason,
            last_committed_time,
            failures: attached,
        } => {
            assert_eq!(*reason, AbortReason::CutLimit { max_cuts: 10 });
            assert_eq!(*last_committed_time, 0.0);
            assert_eq!(attached.substep_cuts, 10);
            assert_eq!(attached.failed_attempts, 11);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(failures.substep_cuts, 10);
    assert_eq!(s, before);
    assert_eq!(err.last_committed_time(), Some(0.0));
}

#[test]
fn floor_aborts_before_cut_limit() {
    let mut d = driver(TimeStepConfig {
        min_step: 5.0,
        ..config(30.0)
    });
    let mut s = state();
    let mut failures = FailureAccumulator::default();
    let err = d
        .run(&ReportStep::new(0, 0.0, 30.0), &Scripted::new(1.0), &mut s, &mut NullSink, &mut failures)
        .unwrap_err();
    assert!(matches!(
        err,
        SimError::Aborted {
            reason: AbortReason::StepBelowFloor { .. },
            ..
        }
    ));
    // 30 -> 15 -> 7.5 -> 3.75 < 5
    assert_eq!(failures.substep_cuts, 2);
}

#[test]
fn accumulator_is_additive_across_report_steps() {
    let mut d = driver(config(30.0));
    let mut s = state();
    let mut failures = FailureAccumulator::default();
    let steps = ReportStep::sequence(0.0, &[30.0, 30.0], Vec::new());
    let total = d
        .run_schedule(&steps, &Scripted::new(20.0), &mut s, &mut NullSink, &mut failures)
        .unwrap();

    assert_eq!(total.report_steps, 2);
    assert_eq!(total.end_time, 60.0);
    assert_eq!(failures.substep_cuts, total.cuts);
    assert!(failures.substep_cuts >= 1);
}

#[test]
fn event_splits_substep_and_applies() {
    let mut d = driver(config(30.0));
    let mut s = state();
    let mut failures = FailureAccumulator::default();
    let step = ReportStep::new(0, 0.0, 30.0).with_event(ScheduleEvent::well(10.0, "P1", EventKind::Shut));

    let report = d
        .run(&step, &Scripted::new(100.0), &mut s, &mut NullSink, &mut failures)
        .unwrap();

    assert_eq!(report.accepted_lengths(), vec![10.0, 20.0]);
    assert_eq!(report.events_applied, 1);
    assert!(s.wells[0].is_shut());
}

#[test]
fn unknown_event_target_is_an_error() {
    let mut d = driver(config(30.0));
    let mut s = state();
    let step = ReportStep::new(0, 0.0, 30.0).with_event(ScheduleEvent::well(0.0, "NOPE", EventKind::Shut));
    let err = d
        .run(&step, &Scripted::new(100.0), &mut s, &mut NullSink, &mut FailureAccumulator::default())
        .unwrap_err();
    assert!(matches!(err, SimError::Schedule(_)));
}

#[test]
fn sink_failures_are_counted_not_fatal() {
    let mut d = driver(config(10.0));
    let mut s = state();
    let mut sink = Recorder {
        fail_writes: true,
        ..Default::default()
    };
    let report = d
        .run(&ReportStep::new(0, 0.0, 30.0), &Scripted::new(100.0), &mut s, &mut sink, &mut FailureAccumulator::default())
        .unwrap();
    assert_eq!(report.output_failures, report.substeps.len());
    assert_eq!(s.time, 30.0);
}

#[test]
fn cancellation_stops_between_substeps() {
    let token = CancelToken::new();
    let mut d = driver(config(10.0)).with_cancel_token(token.clone());
    let mut s = state();
    token.cancel();
    let err = d
        .run(&ReportStep::new(0, 0.0, 30.0), &Scripted::new(100.0), &mut s, &mut NullSink, &mut FailureAccumulator::default())
        .unwrap_err();
    assert_eq!(err, SimError::Cancelled { last_committed_time: 0.0 });
}

#[test]
fn mismatched_start_time_is_rejected() {
    let mut d = driver(config(10.0));
    let mut s = state();
    let err = d
        .run(&ReportStep::new(0, 5.0, 30.0), &Scripted::new(100.0), &mut s, &mut NullSink, &mut FailureAccumulator::default())
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidArg { .. }));
}

#[test]
fn economic_shut_shows_from_the_next_substep() {
    let mut d = driver(config(10.0));
    let mut s = state();
    s.wells[0] = s.wells[0].clone().with_economic_limits(EconomicLimits {
        min_oil_rate: Some(5.0),
        ..Default::default()
    });
    let mut sink = Recorder::default();
    let report = d
        .run(&ReportStep::new(0, 0.0, 20.0), &Scripted::new(100.0), &mut s, &mut sink, &mut FailureAccumulator::default())
        .unwrap();

    assert_eq!(
        sink.wells,
        vec![("oil_rate".to_string(), 1.0), ("shut".to_string(), 0.0)]
    );
    assert_eq!(report.wells_shut_economic, vec!["P1".to_string()]);
}

#[test]
fn initial_state_is_written_once_per_schedule() {
    let mut d = driver(config(10.0));
    let mut s = state();
    let mut sink = Recorder::default();
    let steps = ReportStep::sequence(0.0, &[10.0, 10.0], Vec::new());
    d.run_schedule(&steps, &Scripted::new(100.0), &mut s, &mut sink, &mut FailureAccumulator::default())
        .unwrap();
    assert_eq!(sink.initial_writes, 1);
    assert_eq!(sink.reports, 2);

    let mut direct = Recorder::default();
    let mut s = state();
    driver(config(10.0))
        .run(&ReportStep::new(0, 0.0, 10.0), &Scripted::new(100.0), &mut s, &mut direct, &mut FailureAccumulator::default())
        .unwrap();
    assert_eq!(direct.initial_writes, 0);
}

#[test]
fn suggested_next_step_reaches_sink_and_report() {
    let mut d = driver(config(4.0));
    let mut s = state();
    let mut sink = Recorder::default();
    let report = d
        .run(&ReportStep::new(0, 0.0, 10.0), &Scripted::new(100.0), &mut s, &mut sink, &mut FailureAccumulator::default())
        .unwrap();

    // 4 -> 6 (clamped to the end); the clamp keeps the grown suggestion.
    assert_eq!(sink.lengths, vec![4.0, 6.0]);
    assert_eq!(sink.suggestions, vec![8.0, 12.0]);
    assert_eq!(report.suggested_next_step, 12.0);
    assert_eq!(d.controller().suggested_next_step(), 12.0);
}

#[test]
fn time_stepping_change_applies_from_its_report_step() {
    let mut d = driver(config(2.0));
    let mut s = state();
    let mut sink = Recorder::default();
    let mut steps = ReportStep::sequence(0.0, &[10.0, 10.0], Vec::new());
    steps[1].time_stepping = Some(TimeStepConfig {
        adaptive: false,
        ..config(2.0)
    });
    let total = d
        .run_schedule(&steps, &Scripted::new(100.0), &mut s, &mut sink, &mut FailureAccumulator::default())
        .unwrap();

    assert_eq!(total.report_steps, 2);
    assert_eq!(sink.lengths.last(), Some(&10.0));
    assert!(sink.lengths.len() > 2);
    assert!(!d.controller().config().adaptive);
}

#[test]
fn invalid_time_stepping_change_is_rejected() {
    let mut d = driver(config(2.0));
    let mut s = state();
    let step = ReportStep::new(0, 0.0, 10.0).with_time_stepping(TimeStepConfig {
        cut_factor: 0.0,
        ..config(2.0)
    });
    let err = d
        .run(&step, &Scripted::new(100.0), &mut s, &mut NullSink, &mut FailureAccumulator::default())
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidArg { .. }));
}

#[test]
fn non_adaptive_failure_aborts_without_cutting() {
    let mut d = driver(TimeStepConfig {
        adaptive: false,
        ..config(1.0)
    });
    let mut s = state();
    let mut failures = FailureAccumulator::default();
    let err = d
        .run(&ReportStep::new(0, 0.0, 10.0), &Scripted::new(5.0), &mut s, &mut NullSink, &mut failures)
        .unwrap_err();

    assert!(matches!(
        err,
        SimError::Aborted {
            reason: AbortReason::NotAdaptive,
            ..
        }
    ));
    assert_eq!(failures.failed_attempts, 1);
    assert_eq!(failures.substep_cuts, 0);
    assert_eq!(s.time, 0.0);
}

proptest! {
    #[test]
    fn growth_bound_holds_across_report_steps(
        durations in proptest::collection::vec(0.5f64..200.0, 1..5),
        initial in 0.1f64..100.0,
        max_solvable in 0.2f64..50.0,
    ) {
        let mut d = driver(TimeStepConfig {
            initial_step: initial,
            min_step: 1e-6,
            max_step: 1e6,
            cut_factor: 0.5,
            max_cuts: 40,
            ..Default::default()
        });
        let max_growth = d.controller().config().max_growth;
        let mut s = state();
        let mut sink = Recorder::default();
        let steps = ReportStep::sequence(0.0, &durations, Vec::new());
        let total = d
            .run_schedule(&steps, &Scripted::new(max_solvable), &mut s, &mut sink, &mut FailureAccumulator::default())
            .unwrap();

        let end: f64 = durations.iter().sum();
        prop_assert!((total.end_time - end).abs() <= 1e-9 * end.max(1.0));
        prop_assert_eq!(sink.lengths.len(), total.substeps);
        // Landing on a boundary may stretch a step by the time tolerance.
        for pair in sink.lengths.windows(2) {
            prop_assert!(pair[1] <= max_growth * pair[0] * (1.0 + 1e-12) + 1e-9);
        }
    }

    #[test]
    fn substeps_tile_the_report_step(
        duration in 0.5f64..500.0,
        initial in 0.1f64..100.0,
        max_solvable in 0.2f64..50.0,
        cut_factor in 0.1f64..0.6,
    ) {
        let mut d = driver(TimeStepConfig {
            initial_step: initial,
            min_step: 1e-6,
            max_step: 1e6,
            cut_factor,
            max_cuts: 40,
            ..Default::default()
        });
        let max_growth = d.controller().config().max_growth;
        let mut s = state();
        let mut failures = FailureAccumulator::default();
        let report = d
            .run(&ReportStep::new(0, 0.0, duration), &Scripted::new(max_solvable), &mut s, &mut NullSink, &mut failures)
            .unwrap();

        let lengths = report.accepted_lengths();
        let sum: f64 = lengths.iter().sum();
        prop_assert!((sum - duration).abs() <= 1e-9 * duration.max(1.0));
        prop_assert_eq!(s.time, duration);
        for pair in lengths.windows(2) {
            prop_assert!(pair[1] <= max_growth * pair[0] * (1.0 + 1e-12));
        }
        for len in &lengths {
            prop_assert!(*len > 0.0);
            prop_assert!(*len <= max_solvable);
        }
    }
}
