//! Schema migration framework.

use crate::ProjectError;
use crate::schema::{Case, ControlModeDef};

pub const LATEST_VERSION: u32 = 2;

/// Group that version 1 files put every group-controlled well in.
pub const LEGACY_FIELD_GROUP: &str = "FIELD";

pub fn migrate_to_latest(mut case: Case) -> Result<Case, ProjectError> {
    while case.version < LATEST_VERSION {
        case = migrate_one_version(case)?;
    }
    Ok(case)
}

fn migrate_one_version(case: Case) -> Result<Case, ProjectError> {
    match case.version {
        0 => migrate_v0_to_v1(case),
        1 => migrate_v1_to_v2(case),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

fn migrate_v0_to_v1(mut case: Case) -> Result<Case, ProjectError> {
    case.version = 1;
    Ok(case)
}

/// Version 2 made well groups explicit.
fn migrate_v1_to_v2(mut case: Case) -> Result<Case, ProjectError> {
    for well in &mut case.wells {
        if well.group.is_none() && well.control.mode == ControlModeDef::GroupRate {
            well.group = Some(LEGACY_FIELD_GROUP.to_string());
        }
    }
    case.version = 2;
    Ok(case)
}
