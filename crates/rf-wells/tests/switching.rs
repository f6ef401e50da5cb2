use proptest::prelude::*;
use rf_core::WellId;
use rf_wells::{
    ControlDecision, ControlMode, ControlSpec, EventKind, LimitSet, PhaseRates, RateCaps,
    RatePhase, ScheduleEvent, WellControlStateMachine, WellKind, WellSolution, WellState,
};

fn producer(min_bhp: f64) -> WellState {
    WellState::new(
        WellId::from_index(0),
        "PROD",
        WellKind::Producer,
        ControlSpec::new(ControlMode::Rate(RatePhase::Oil), 1000.0),
        LimitSet {
            min_bhp: Some(min_bhp),
            ..Default::default()
        },
    )
    .unwrap()
}

/// A producer whose BHP under the rate target falls to 90 against a 100
/// floor ends the iteration on BHP control at 100.
#[test]
fn producer_drawdown_switches_to_bhp_floor() {
    let mut sm = WellControlStateMachine::default();
    let mut well = producer(100.0);

    let proposal = WellSolution::new(PhaseRates::new(1000.0, 0.0, 0.0), 90.0);
    let decision = sm.evaluate(&mut well, &proposal, 0);

    assert!(decision.switched());
    assert_eq!(well.control_mode, ControlMode::Bhp);
    assert_eq!(well.target_value, 100.0);

    // The BHP-controlled well can only produce 800 now; no further switch.
    let under_bhp = WellSolution::new(PhaseRates::new(800.0, 0.0, 0.0), 100.0);
    assert_eq!(sm.evaluate(&mut well, &under_bhp, 1), ControlDecision::Unchanged);
}

#[test]
fn schedule_round_trip_shut_then_open() {
    let mut sm = WellControlStateMachine::default();
    let mut wells = vec![producer(100.0)];
    sm.apply_event(&mut wells, &ScheduleEvent::well(10.0, "PROD", EventKind::Shut))
        .unwrap();
    assert!(wells[0].is_shut());
    sm.apply_event(&mut wells, &ScheduleEvent::well(20.0, "PROD", EventKind::Open))
        .unwrap();
    assert_eq!(wells[0].active_control(), wells[0].configured);
}

proptest! {
    /// Whatever the proposal, a switch lands the well on a control that the
    /// proposal violated, and a second evaluation in the same iteration is a
    /// no-op.
    #[test]
    fn switch_targets_a_binding_constraint(
        oil in 0.0f64..3000.0,
        water in 0.0f64..3000.0,
        bhp in 0.0f64..400.0,
        start_on_bhp in any::<bool>(),
    ) {
        let mut sm = WellControlStateMachine::default();
        let mut well = WellState::new(
            WellId::from_index(1),
            "P",
            WellKind::Producer,
            ControlSpec::new(ControlMode::Rate(RatePhase::Oil), 1000.0),
            LimitSet {
                min_bhp: Some(100.0),
                max_rates: RateCaps { water: Some(500.0), liquid: Some(2500.0), ..Default::default() },
                ..Default::default()
            },
        )
        .unwrap();
        if start_on_bhp {
            sm.apply_to_well(&mut well, &EventKind::SetControl(ControlSpec::new(ControlMode::Bhp, 100.0))).unwrap();
        }
        let proposal = WellSolution::new(PhaseRates::new(oil, water, 0.0), bhp);
        let before = well.active_control();
        let tol = sm.config().tolerance;

        match sm.evaluate(&mut well, &proposal, 7) {
            ControlDecision::Unchanged => prop_assert_eq!(well.active_control(), before),
            ControlDecision::Switched { from, to } => {
                prop_assert_eq!(from, before.mode);
                prop_assert_ne!(to.mode, before.mode);
                prop_assert!(!well.violations(&proposal, tol).is_empty());
                prop_assert_eq!(sm.evaluate(&mut well, &proposal, 7), ControlDecision::Unchanged);
            }
        }
    }
}
