use clap::{Parser, Subcommand};
use rf_app::{
    AppError, AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, RunTimingSummary,
    project_service, query, run_service,
};
use rf_results::{RunManifest, RunStatus};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rf-cli")]
#[command(about = "resflow CLI - tank reservoir simulation with adaptive time stepping", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate case file syntax and structure
    Validate {
        /// Path to the case file (YAML or JSON)
        case_path: PathBuf,
    },
    /// Summarize cells, wells and schedule of a case
    Summary {
        /// Path to the case file
        case_path: PathBuf,
    },
    /// Run the case schedule
    Run {
        /// Path to the case file
        case_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List stored runs of a case
    Runs {
        /// Path to the case file
        case_path: PathBuf,
    },
    /// Show details of a stored run
    ShowRun {
        /// Path to the case file
        case_path: PathBuf,
        /// Run ID to display, or `latest`
        run_id: String,
    },
    /// Export a well or cell time series from a run as CSV
    ExportSeries {
        /// Path to the case file
        case_path: PathBuf,
        /// Run ID, or `latest`
        run_id: String,
        /// Well name or cell id
        entity_id: String,
        /// Variable name (e.g., oil_rate, water_cut, bhp, pressure)
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Summary { case_path } => cmd_summary(&case_path),
        Commands::Run {
            case_path,
            no_cache,
        } => cmd_run(&case_path, !no_cache),
        Commands::Runs { case_path } => cmd_runs(&case_path),
        Commands::ShowRun { case_path, run_id } => cmd_show_run(&case_path, &run_id),
        Commands::ExportSeries {
            case_path,
            run_id,
            entity_id,
            variable,
            output,
        } => cmd_export_series(
            &case_path,
            &run_id,
            &entity_id,
            &variable,
            output.as_deref(),
        ),
    }
}

fn cmd_validate(case_path: &Path) -> AppResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = project_service::load_case(case_path)?;
    project_service::validate_case(&case)?;
    println!("✓ Case is valid");
    Ok(())
}

fn cmd_summary(case_path: &Path) -> AppResult<()> {
    let case = project_service::load_case(case_path)?;
    let s = project_service::summarize_case(&case);

    println!("{} (version {})", s.name, s.version);
    println!("  Cells: {} ({} connections)", s.cell_count, s.connection_count);
    println!("  Wells: {} producers, {} injectors", s.producer_count, s.injector_count);
    if !s.groups.is_empty() {
        println!("  Groups: {}", s.groups.join(", "));
    }
    println!(
        "  Schedule: {} report steps, {:.1} days, {} events",
        s.report_step_count, s.total_days, s.event_count
    );
    Ok(())
}

fn cmd_run(case_path: &Path, use_cache: bool) -> AppResult<()> {
    println!("Running case: {}", case_path.display());

    let request = RunRequest {
        case_path,
        options: RunOptions {
            use_cache,
            ..Default::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage: Option<RunStage> = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Run stored: {}", response.run_id);
    }
    print_status(&response.manifest);
    print_timing_summary(&response.timing);
    print_run_summary(&response.manifest);
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(140));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    if let Some(step) = &event.step {
        let width = 28usize;
        let filled = ((step.fraction_complete * width as f64).round() as usize).min(width);
        let bar = format!(
            "{}{}",
            "#".repeat(filled),
            "-".repeat(width.saturating_sub(filled))
        );
        print!(
            "\r[{}] {:>6.2}%  t={:.2}/{:.2}d  report={}  dt={:.3}d  newton={}  cuts={}  elapsed={:.1}s",
            bar,
            step.fraction_complete * 100.0,
            step.sim_time_days,
            step.end_time_days,
            step.report_step,
            step.dt_days,
            step.newton_iterations,
            step.cuts,
            event.elapsed_wall_s
        );
    } else {
        let spinner = ['|', '/', '-', '\\'];
        let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
        let mut line = format!(
            "\r{} {}  elapsed={:.2}s",
            spinner[spin_idx],
            event.stage.label(),
            event.elapsed_wall_s
        );
        if let Some(msg) = &event.message {
            line.push_str(&format!("  {}", msg));
        }
        print!("{}", line);
    }
    let _ = io::stdout().flush();
}

fn print_status(manifest: &RunManifest) {
    match &manifest.status {
        RunStatus::Completed => println!("  Status: completed"),
        RunStatus::Failed {
            reason,
            last_committed_days,
        } => println!("  Status: FAILED at day {last_committed_days:.4}: {reason}"),
        RunStatus::Cancelled {
            last_committed_days,
        } => println!("  Status: cancelled at day {last_committed_days:.4}"),
    }
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    let pct = |t: f64| 100.0 * t / total;

    println!("\nTiming summary:");
    println!(
        "  Compile:  {:.3}s ({:.1}%)",
        timing.compile_time_s,
        pct(timing.compile_time_s)
    );
    println!(
        "  Simulate: {:.3}s ({:.1}%)",
        timing.simulate_time_s,
        pct(timing.simulate_time_s)
    );
    println!("    Newton: {:.3}s", timing.newton_time_s);
    println!("    Output: {:.3}s", timing.output_time_s);
    println!(
        "  Save:     {:.3}s ({:.1}%)",
        timing.save_time_s,
        pct(timing.save_time_s)
    );
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    }
    println!("  Total:    {:.3}s", timing.total_time_s);
}

fn print_run_summary(manifest: &RunManifest) {
    let s = &manifest.summary;
    println!("\nRun summary:");
    println!("  End time:          {:.3} days", s.end_time_days);
    println!("  Report steps:      {}", s.report_steps);
    println!("  Substeps:          {}", s.substeps);
    println!("  Cuts:              {}", s.cuts);
    println!("  Newton iterations: {}", s.newton_iterations);
    println!("  Wasted iterations: {}", s.wasted_newton_iterations);
    println!("  Linear iterations: {}", s.linear_iterations);
    println!("  Well switches:     {}", s.well_switches);
}

fn cmd_runs(case_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(case_path)?;

    if runs.is_empty() {
        println!("No stored runs for case: {}", case_path.display());
    } else {
        println!("Stored runs:");
        for manifest in runs {
            let state = if manifest.status.is_completed() {
                "completed"
            } else {
                "incomplete"
            };
            println!("  {} ({}, {})", manifest.run_id, manifest.timestamp, state);
        }
    }
    Ok(())
}

fn cmd_show_run(case_path: &Path, run_id: &str) -> AppResult<()> {
    let run_id = run_service::resolve_run_id(case_path, run_id)?;
    println!("Loading run: {}", run_id);

    let (manifest, records) = run_service::load_run(case_path, &run_id)?;
    print_status(&manifest);
    print_run_summary(&manifest);
    if manifest.summary.substeps == 0 {
        println!("\nNo substeps were committed.");
        return Ok(());
    }

    let summary = query::get_run_summary(&records)?;
    println!("\nRecords:");
    println!("  Count: {} (initial state + substeps)", summary.record_count);
    println!(
        "  Time range: {:.3} - {:.3} days",
        summary.time_range_days.0, summary.time_range_days.1
    );

    println!("\nCells:");
    for id in query::list_cell_ids(&records) {
        println!("  {}", id);
    }

    println!("\nWells:");
    for name in query::list_well_names(&records) {
        let volumes = query::cumulative_volumes(&records, &name);
        let history = query::well_control_history(&records, &name);
        let modes: Vec<String> = history
            .iter()
            .map(|(t, mode)| format!("{mode}@{t:.2}d"))
            .collect();
        println!(
            "  {:<10} oil={:.1} m3  water={:.1} m3  controls: {}",
            name,
            volumes.oil,
            volumes.water,
            modes.join(" -> ")
        );
    }

    Ok(())
}

fn cmd_export_series(
    case_path: &Path,
    run_id: &str,
    entity_id: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let run_id = run_service::resolve_run_id(case_path, run_id)?;
    let (_manifest, records) = run_service::load_run(case_path, &run_id)?;

    let is_cell = query::list_cell_ids(&records).iter().any(|c| c == entity_id);
    let series = if is_cell {
        query::extract_cell_series(&records, entity_id, variable)?
    } else if query::list_well_names(&records).iter().any(|w| w == entity_id) {
        query::extract_well_series(&records, entity_id, variable)?
    } else {
        return Err(AppError::InvalidInput(format!(
            "No well or cell named '{entity_id}' in run {run_id}"
        )));
    };
    debug!(entity = entity_id, variable, points = series.len(), "exporting series");

    let csv = query::series_to_csv(&series, variable);

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
