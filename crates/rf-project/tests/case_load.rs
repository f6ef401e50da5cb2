use rf_project::{
    ControlModeDef, EventActionDef, LATEST_VERSION, ProjectError, ValidationError, WellKindDef,
    load_case, parse_json, parse_yaml, save_json, save_yaml,
};

const TWO_CELL: &str = include_str!("../../../cases/two_cell.yaml");

#[test]
fn bundled_case_loads() {
    let case = parse_yaml(TWO_CELL).unwrap();
    assert_eq!(case.version, LATEST_VERSION);
    assert_eq!(case.reservoir.cells.len(), 2);
    assert_eq!(case.wells.len(), 3);
    assert_eq!(
        case.wells[2].kind,
        WellKindDef::Injector {
            phase: rf_project::PhaseDef::Water
        }
    );
    assert!(case.wells[2].initially_shut);
    assert_eq!(case.schedule.total_days(), 210.0);
    assert!(matches!(
        case.schedule.events[1].action,
        EventActionDef::SetLimits(l) if l.min_bhp_bar == Some(170.0)
    ));
    // Defaults fill what the file leaves out.
    assert_eq!(case.timestepping.max_cuts, 10);
    assert_eq!(case.timestepping.max_step_days, 30.0);
    assert_eq!(case.newton.max_iterations, 15);
}

#[test]
fn version_one_group_wells_join_field_group() {
    let yaml = TWO_CELL
        .replace("version: 2", "version: 1")
        .replace("control: { mode: liquid_rate, target: 400 }", "control: { mode: group_rate, target: 400 }")
        .replace("    group: north_pad\n    productivity_index_m3_per_day_bar: 10", "    productivity_index_m3_per_day_bar: 10");
    let case = parse_yaml(&yaml).unwrap();
    assert_eq!(case.wells[1].control.mode, ControlModeDef::GroupRate);
    assert_eq!(case.wells[1].group.as_deref(), Some("FIELD"));
}

#[test]
fn missing_cell_reference_is_rejected() {
    let yaml = TWO_CELL.replace("cell: north", "cell: west");
    match parse_yaml(&yaml) {
        Err(ProjectError::Validation(ValidationError::MissingReference { id, .. })) => {
            assert_eq!(id, "west")
        }
        other => panic!("expected missing reference, got {other:?}"),
    }
}

#[test]
fn duplicate_well_is_rejected() {
    let yaml = TWO_CELL.replace("name: PROD2", "name: PROD1");
    assert!(matches!(
        parse_yaml(&yaml),
        Err(ProjectError::Validation(ValidationError::DuplicateId { .. }))
    ));
}

#[test]
fn event_on_unknown_group_is_rejected() {
    let yaml = TWO_CELL.replace("group: north_pad, action", "group: east_pad, action");
    assert!(matches!(
        parse_yaml(&yaml),
        Err(ProjectError::Validation(ValidationError::MissingReference { .. }))
    ));
}

#[test]
fn injector_oil_rate_is_unsupported() {
    let yaml = TWO_CELL.replace("control: { mode: water_rate, target: 500 }", "control: { mode: oil_rate, target: 500 }");
    assert!(matches!(
        parse_yaml(&yaml),
        Err(ProjectError::Validation(ValidationError::Unsupported { .. }))
    ));
}

#[test]
fn bad_cut_factor_is_rejected() {
    let yaml = TWO_CELL.replace("  max_step_days: 30", "  max_step_days: 30\n  cut_factor: 1.5");
    assert!(parse_yaml(&yaml).is_err());
}

#[test]
fn phase_fractions_must_sum_to_one() {
    let yaml = TWO_CELL.replace("{ oil: 0.8, water: 0.2 }", "{ oil: 0.8, water: 0.3 }");
    assert!(parse_yaml(&yaml).is_err());
}

#[test]
fn save_and_reload_by_extension() {
    let case = parse_yaml(TWO_CELL).unwrap();
    let dir = std::env::temp_dir().join(format!("rf-project-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let json_path = dir.join("case.json");
    save_json(&json_path, &case).unwrap();
    assert_eq!(load_case(&json_path).unwrap(), case);
    let json = std::fs::read_to_string(&json_path).unwrap();
    assert_eq!(parse_json(&json).unwrap(), case);

    let yaml_path = dir.join("case.yml");
    save_yaml(&yaml_path, &case).unwrap();
    assert_eq!(load_case(&yaml_path).unwrap(), case);

    assert!(matches!(
        load_case(&dir.join("case.txt")),
        Err(ProjectError::UnknownFormat { .. })
    ));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn well_kind_is_tagged_by_type() {
    let producer: WellKindDef = serde_yaml::from_str("{ type: producer }").unwrap();
    assert_eq!(producer, WellKindDef::Producer);
    let injector: WellKindDef = serde_yaml::from_str("type: injector\nphase: gas\n").unwrap();
    assert_eq!(
        injector,
        WellKindDef::Injector {
            phase: rf_project::PhaseDef::Gas
        }
    );
    assert_eq!(
        serde_json::to_string(&injector).unwrap(),
        r#"{"type":"injector","phase":"gas"}"#
    );
}

#[test]
fn tuning_entries_are_validated() {
    let with_tuning = |entries: &str| TWO_CELL.replace("  events:", &format!("  tuning:\n{entries}  events:"));

    let ok = parse_yaml(&with_tuning(
        "    - report_step: 1\n      timestepping: { adaptive: false }\n",
    ))
    .unwrap();
    assert!(ok.timestepping.adaptive);
    assert!(!ok.schedule.tuning[0].timestepping.adaptive);
    assert_eq!(ok.schedule.tuning[0].timestepping.max_cuts, 10);

    for bad in [
        "    - report_step: 4\n      timestepping: {}\n",
        "    - report_step: 2\n      timestepping: {}\n    - report_step: 1\n      timestepping: {}\n",
        "    - report_step: 1\n      timestepping: { cut_factor: 0 }\n",
    ] {
        match parse_yaml(&with_tuning(bad)) {
            Err(ProjectError::Validation(ValidationError::InvalidValue { field, .. })) => {
                assert!(field.starts_with("schedule.tuning["), "{field}")
            }
            other => panic!("expected invalid tuning, got {other:?}"),
        }
    }
}
