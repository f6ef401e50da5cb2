//! Shared application service layer for resflow.
//!
//! Compiles case files into a runnable tank model, drives the time stepper
//! over the schedule, stores results, and answers queries on stored runs.
//! The CLI is a thin layer over this crate.

pub mod compile;
pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod recording;
pub mod run_service;
pub mod tank;

pub use compile::{CompiledCase, compile_case};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, StepProgress};
pub use project_service::{CaseSummary, get_well, load_case, save_case, summarize_case, validate_case};
pub use query::{
    CumulativeVolumes, RunDataSummary, cumulative_volumes, extract_cell_series,
    extract_well_series, get_run_summary, list_cell_ids, list_well_names, series_to_csv,
    well_control_history,
};
pub use recording::RecordingSink;
pub use run_service::{
    RunOptions, RunOutcome, RunRequest, RunResponse, RunTimingSummary, ensure_run,
    ensure_run_with_progress, list_runs, load_run, resolve_run_id, run_case,
    run_case_with_progress,
};
pub use tank::{TankCell, TankConnection, TankModel, TankWell};
