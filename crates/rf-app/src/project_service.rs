//! Case loading, saving, validation, and introspection.

use std::collections::BTreeSet;
use std::path::Path;

use rf_project::{Case, WellDef, WellKindDef};

use crate::error::{AppError, AppResult};

/// Summary of a case for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSummary {
    pub name: String,
    pub version: u32,
    pub cell_count: usize,
    pub connection_count: usize,
    pub producer_count: usize,
    pub injector_count: usize,
    pub groups: Vec<String>,
    pub report_step_count: usize,
    pub total_days: f64,
    pub event_count: usize,
}

/// Load a case file, migrating it to the latest version and validating it.
pub fn load_case(path: &Path) -> AppResult<Case> {
    Ok(rf_project::load_case(path)?)
}

/// Save a case; the extension picks YAML or JSON.
pub fn save_case(path: &Path, case: &Case) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => rf_project::save_json(path, case)?,
        Some("yaml" | "yml") => rf_project::save_yaml(path, case)?,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Unsupported case file extension: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

pub fn validate_case(case: &Case) -> AppResult<()> {
    rf_project::validate_case(case).map_err(|e| AppError::Project(e.to_string()))
}

pub fn summarize_case(case: &Case) -> CaseSummary {
    let producer_count = case
        .wells
        .iter()
        .filter(|w| matches!(w.kind, WellKindDef::Producer))
        .count();
    let groups: BTreeSet<&str> = case.wells.iter().filter_map(|w| w.group.as_deref()).collect();
    CaseSummary {
        name: case.name.clone(),
        version: case.version,
        cell_count: case.reservoir.cells.len(),
        connection_count: case.reservoir.connections.len(),
        producer_count,
        injector_count: case.wells.len() - producer_count,
        groups: groups.into_iter().map(str::to_string).collect(),
        report_step_count: case.schedule.report_steps_days.len(),
        total_days: case.schedule.total_days(),
        event_count: case.schedule.events.len(),
    }
}

/// Get a well definition by name.
pub fn get_well<'a>(case: &'a Case, name: &str) -> AppResult<&'a WellDef> {
    case.wells
        .iter()
        .find(|w| w.name == name)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown well: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_bundled_case() {
        let case = rf_project::parse_yaml(include_str!("../../../cases/two_cell.yaml")).unwrap();
        let summary = summarize_case(&case);

        assert_eq!(summary.cell_count, 2);
        assert_eq!(summary.producer_count, 2);
        assert_eq!(summary.injector_count, 1);
        assert_eq!(summary.groups, vec!["north_pad".to_string()]);
        assert_eq!(summary.total_days, 210.0);
        assert!(get_well(&case, "INJ1").is_ok());
        assert!(matches!(get_well(&case, "NOPE"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn save_rejects_unknown_extension() {
        let case = rf_project::parse_yaml(include_str!("../../../cases/two_cell.yaml")).unwrap();
        let path = std::env::temp_dir().join("rf_app_case.txt");
        assert!(matches!(save_case(&path, &case), Err(AppError::InvalidInput(_))));
    }
}
