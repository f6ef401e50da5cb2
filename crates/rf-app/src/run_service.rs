//! Run execution and caching service.

use std::path::Path;
use std::time::Instant;

use rf_project::Case;
use rf_project::units::time_days;
use rf_results::{RunManifest, RunStatus, RunStore, RunSummary, TimeseriesRecord};
use rf_sim::{
    CancelToken, FailureAccumulator, ReportStepDriver, SimError, SimulationReport, SubstepController,
};
use rf_solver::{ModelState, NonlinearSolver};
use tracing::{info, warn};

use crate::compile::compile_case;
use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service;
use crate::recording::RecordingSink;

/// Options for running simulations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
    /// Checked between substeps.
    pub cancel: Option<CancelToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
            cancel: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub case_path: &'a Path,
    pub options: RunOptions,
}

/// Wall-clock breakdown of a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub simulate_time_s: f64,
    /// Time inside Newton solves of accepted substeps.
    pub newton_time_s: f64,
    pub output_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

/// Everything an in-memory run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub summary: RunSummary,
    pub records: Vec<TimeseriesRecord>,
    pub report: SimulationReport,
    pub failures: FailureAccumulator,
    /// State at the last committed substep.
    pub final_state: ModelState,
    pub compile_time_s: f64,
    pub simulate_time_s: f64,
}

fn emit_progress(
    progress_cb: &mut Option<&mut (dyn FnMut(RunProgressEvent) + '_)>,
    stage: RunStage,
    started: Instant,
    message: &str,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.to_string()),
        ));
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
///
/// Aborted and cancelled runs are stored too, with their records up to the
/// last committed substep, so the response is `Ok` for them; check
/// `manifest.status`.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut (dyn FnMut(RunProgressEvent) + '_)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(&mut progress_cb, RunStage::LoadingCase, started, "Loading case");
    let case = project_service::load_case(request.case_path)?;

    emit_progress(&mut progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let run_id = rf_results::compute_run_id(&case, &request.options.solver_version);
    let store = RunStore::for_case(request.case_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            "Loading cached run",
        );
        let load_started = Instant::now();
        let manifest = store.load_manifest(&run_id)?;
        timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
        timing.total_time_s = started.elapsed().as_secs_f64();
        emit_progress(&mut progress_cb, RunStage::Completed, started, "Loaded cached run");
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            timing,
        });
    }

    let outcome = run_case_with_progress(
        &case,
        request.options.cancel.clone(),
        progress_cb.as_deref_mut(),
    )?;
    timing.compile_time_s = outcome.compile_time_s;
    timing.simulate_time_s = outcome.simulate_time_s;
    timing.newton_time_s = outcome.report.solver_time_s;
    timing.output_time_s = outcome.report.output_time_s;

    emit_progress(&mut progress_cb, RunStage::SavingResults, started, "Saving results");
    let manifest = RunManifest {
        run_id: run_id.clone(),
        case_name: case.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: request.options.solver_version.clone(),
        status: outcome.status,
        summary: outcome.summary,
    };
    let save_started = Instant::now();
    store.save_run(&manifest, &outcome.records)?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, RunStage::Completed, started, "Run completed");

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        timing,
    })
}

/// Run a case in memory without touching the run store.
pub fn run_case(case: &Case, cancel: Option<CancelToken>) -> AppResult<RunOutcome> {
    run_case_with_progress(case, cancel, None)
}

pub fn run_case_with_progress(
    case: &Case,
    cancel: Option<CancelToken>,
    mut progress_cb: Option<&mut (dyn FnMut(RunProgressEvent) + '_)>,
) -> AppResult<RunOutcome> {
    let started = Instant::now();
    emit_progress(&mut progress_cb, RunStage::Compiling, started, "Compiling case");
    let compiled = compile_case(case)?;
    let compile_time_s = started.elapsed().as_secs_f64();

    let solver = NonlinearSolver::dense(compiled.newton.clone())?;
    let controller = SubstepController::new(compiled.timestepping.clone())?;
    let mut driver = ReportStepDriver::new(solver, controller);
    if let Some(token) = cancel {
        driver = driver.with_cancel_token(token);
    }

    emit_progress(&mut progress_cb, RunStage::Simulating, started, "Simulating");
    let end_time = compiled.end_time();
    let mut sink = RecordingSink::new(&compiled.cell_ids, end_time);
    if let Some(cb) = progress_cb.as_mut() {
        sink = sink.with_progress(&mut **cb, started);
    }

    let simulate_started = Instant::now();
    let mut state = compiled.initial_state.clone();
    let mut failures = FailureAccumulator::default();
    let mut report = SimulationReport::default();
    let mut status = RunStatus::Completed;

    if driver.write_initial_state(&state, &mut sink) {
        report.output_failures += 1;
    }
    for step in &compiled.report_steps {
        match driver.run(step, &compiled.model, &mut state, &mut sink, &mut failures) {
            Ok(step_report) => report.add(&step_report),
            Err(SimError::Aborted {
                reason,
                last_committed_time,
                ..
            }) => {
                warn!(
                    case = %case.name,
                    report_step = step.index,
                    %reason,
                    "run aborted"
                );
                status = RunStatus::Failed {
                    reason: reason.to_string(),
                    last_committed_days: time_days(last_committed_time),
                };
                break;
            }
            Err(SimError::Cancelled { last_committed_time }) => {
                info!(case = %case.name, "run cancelled");
                status = RunStatus::Cancelled {
                    last_committed_days: time_days(last_committed_time),
                };
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    let simulate_time_s = simulate_started.elapsed().as_secs_f64();
    let records = sink.into_records();

    let summary = RunSummary {
        end_time_days: time_days(state.time),
        report_steps: report.report_steps,
        substeps: report.substeps,
        cuts: failures.substep_cuts,
        newton_iterations: records.iter().map(|r| r.newton_iterations).sum(),
        linear_iterations: report.linear_iterations,
        well_switches: report.well_switches,
        wasted_newton_iterations: failures.nonlinear_iterations_total,
        solver_time_s: report.solver_time_s,
    };
    info!(
        case = %case.name,
        end_days = summary.end_time_days,
        substeps = summary.substeps,
        cuts = summary.cuts,
        "run finished"
    );

    Ok(RunOutcome {
        status,
        summary,
        records,
        report,
        failures,
        final_state: state,
        compile_time_s,
        simulate_time_s,
    })
}

/// List stored runs of a case, most recent first.
pub fn list_runs(case_path: &Path) -> AppResult<Vec<RunManifest>> {
    let case = project_service::load_case(case_path)?;
    let store = RunStore::for_case(case_path)?;

    let mut runs = store.list_runs(&case.name)?;
    runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(runs)
}

/// Resolve `latest` to the most recent stored run id; any other id is
/// returned unchanged.
pub fn resolve_run_id(case_path: &Path, run_id: &str) -> AppResult<String> {
    if run_id != "latest" {
        return Ok(run_id.to_string());
    }
    let case = project_service::load_case(case_path)?;
    let store = RunStore::for_case(case_path)?;
    store
        .latest_run(&case.name, false)?
        .map(|m| m.run_id)
        .ok_or_else(|| AppError::RunNotFound(format!("no stored runs for case '{}'", case.name)))
}

/// Load a specific run.
pub fn load_run(case_path: &Path, run_id: &str) -> AppResult<(RunManifest, Vec<TimeseriesRecord>)> {
    let store = RunStore::for_case(case_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_timeseries(run_id)?;

    Ok((manifest, records))
}
