//! rf-project: case file format and validation.

pub mod migrate;
pub mod schema;
pub mod units;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_case};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Unsupported case file extension: {path}")]
    UnknownFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn finish(case: Case) -> ProjectResult<Case> {
    let case = migrate_to_latest(case)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn parse_yaml(content: &str) -> ProjectResult<Case> {
    finish(serde_yaml::from_str(content)?)
}

pub fn parse_json(content: &str) -> ProjectResult<Case> {
    finish(serde_json::from_str(content)?)
}

pub fn load_yaml(path: &Path) -> ProjectResult<Case> {
    parse_yaml(&std::fs::read_to_string(path)?)
}

pub fn load_json(path: &Path) -> ProjectResult<Case> {
    parse_json(&std::fs::read_to_string(path)?)
}

/// Load by extension: `.json` as JSON, `.yaml`/`.yml` as YAML.
pub fn load_case(path: &Path) -> ProjectResult<Case> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        Some("yaml" | "yml") => load_yaml(path),
        _ => Err(ProjectError::UnknownFormat {
            path: path.display().to_string(),
        }),
    }
}

pub fn save_yaml(path: &Path, case: &Case) -> ProjectResult<()> {
    validate_case(case)?;
    let content = serde_yaml::to_string(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn save_json(path: &Path, case: &Case) -> ProjectResult<()> {
    validate_case(case)?;
    let content = serde_json::to_string_pretty(case)?;
    std::fs::write(path, content)?;
    Ok(())
}
