//! Newton iteration on a fixed time increment.

use std::fmt;

use nalgebra::DVector;
use rf_core::{Stopwatch, WellId};
use rf_wells::{SwitchConfig, WellControlStateMachine};
use tracing::debug;

use crate::assembler::{Assembler, Linearization};
use crate::error::{SolverError, SolverResult};
use crate::linear::{DenseLuSolver, LinearSolver};
use crate::state::ModelState;

/// Newton solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonConfig {
    /// Iteration ceiling; reaching it is a non-converged report.
    pub max_iterations: usize,
    /// Iterations performed before convergence can be declared (at least 1).
    pub min_iterations: usize,
    /// Tolerance per residual norm. A norm without its own entry uses the
    /// last one.
    pub tolerances: Vec<f64>,
    /// Fraction of the Newton update applied.
    pub relaxation: f64,
    /// Largest absolute change of any unknown in one iteration.
    pub max_change: Option<f64>,
    /// Lower bound on every unknown after an update.
    pub min_value: Option<f64>,
    pub switching: SwitchConfig,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            min_iterations: 1,
            tolerances: vec![1e-6],
            relaxation: 1.0,
            max_change: None,
            min_value: None,
            switching: SwitchConfig::default(),
        }
    }
}

impl NewtonConfig {
    pub fn validate(&self) -> SolverResult<()> {
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidConfig {
                what: "max_iterations must be at least 1",
            });
        }
        if self.min_iterations > self.max_iterations {
            return Err(SolverError::InvalidConfig {
                what: "min_iterations must not exceed max_iterations",
            });
        }
        if self.tolerances.is_empty() || self.tolerances.iter().any(|t| !(*t > 0.0)) {
            return Err(SolverError::InvalidConfig {
                what: "tolerances must be non-empty and positive",
            });
        }
        if !(self.relaxation > 0.0 && self.relaxation <= 1.0) {
            return Err(SolverError::InvalidConfig {
                what: "relaxation must be in (0, 1]",
            });
        }
        if let Some(dx) = self.max_change
            && !(dx > 0.0)
        {
            return Err(SolverError::InvalidConfig {
                what: "max_change must be positive",
            });
        }
        Ok(())
    }

    fn tolerance(&self, norm_index: usize) -> f64 {
        self.tolerances
            .get(norm_index)
            .or(self.tolerances.last())
            .copied()
            .unwrap_or(f64::MIN_POSITIVE)
    }

    fn converged(&self, norms: &[f64]) -> bool {
        norms
            .iter()
            .enumerate()
            .all(|(i, n)| *n < self.tolerance(i))
    }
}

/// Why a solve did not converge.
#[derive(Debug, Clone, PartialEq)]
pub enum NonConvergence {
    IterationLimit,
    LinearSolveFailed,
    AssemblyFailed(String),
    NonFinite,
}

impl fmt::Display for NonConvergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonConvergence::IterationLimit => write!(f, "iteration limit reached"),
            NonConvergence::LinearSolveFailed => write!(f, "linear solve failed"),
            NonConvergence::AssemblyFailed(what) => write!(f, "assembly failed: {what}"),
            NonConvergence::NonFinite => write!(f, "non-finite residual or unknowns"),
        }
    }
}

/// One Newton iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Norms after the update of this iteration.
    pub residual_norms: Vec<f64>,
    pub linear_iterations: usize,
    pub well_switched: bool,
    pub switched_wells: Vec<WellId>,
}

/// Outcome of one nonlinear solve.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvergenceReport {
    /// Newton updates applied.
    pub iteration_count: usize,
    /// Norms at the last iterate.
    pub residual_norms: Vec<f64>,
    /// Norms at the starting iterate, before any update.
    pub initial_residual_norms: Vec<f64>,
    pub converged: bool,
    /// Whether any well switched control during the solve.
    pub well_switched: bool,
    pub switch_count: usize,
    pub linear_iterations: usize,
    pub linearizations: usize,
    pub iterations: Vec<IterationRecord>,
    pub failure: Option<NonConvergence>,
    pub wall_time_s: f64,
}

impl ConvergenceReport {
    fn fail(mut self, reason: NonConvergence, watch: &mut Stopwatch) -> Self {
        debug!(reason = %reason, iterations = self.iteration_count, "newton solve failed");
        self.converged = false;
        self.failure = Some(reason);
        watch.stop();
        self.wall_time_s = watch.total_seconds();
        self
    }
}

/// Newton driver keeping wells on feasible controls.
#[derive(Debug, Clone)]
pub struct NonlinearSolver<L = DenseLuSolver> {
    config: NewtonConfig,
    linear: L,
    well_control: WellControlStateMachine,
}

impl NonlinearSolver<DenseLuSolver> {
    pub fn dense(config: NewtonConfig) -> SolverResult<Self> {
        Self::new(config, DenseLuSolver)
    }
}

impl<L: LinearSolver> NonlinearSolver<L> {
    pub fn new(config: NewtonConfig, linear: L) -> SolverResult<Self> {
        config.validate()?;
        let well_control = WellControlStateMachine::new(config.switching);
        Ok(Self {
            config,
            linear,
            well_control,
        })
    }

    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    pub fn well_control(&self) -> &WellControlStateMachine {
        &self.well_control
    }

    pub fn well_control_mut(&mut self) -> &mut WellControlStateMachine {
        &mut self.well_control
    }

    /// Iterate `state` towards the solution at `state.time + dt`.
    ///
    /// On return `state` holds the last iterate whether or not the solve
    /// converged; restoring a snapshot is the caller's business. Each
    /// iteration solves the linear system, applies the relaxed and clamped
    /// update, evaluates every well against the new iterate, then
    /// re-assembles for the norms. A well switch, or a well left outside
    /// its limits, makes the iteration non-convergent.
    pub fn solve<A: Assembler + ?Sized>(
        &mut self,
        assembler: &A,
        state: &mut ModelState,
        dt: f64,
    ) -> ConvergenceReport {
        let mut watch = Stopwatch::started();
        let mut report = ConvergenceReport::default();
        self.well_control.reset();

        let mut lin = match self.linearize(assembler, state, dt, &mut report) {
            Ok(lin) => lin,
            Err(reason) => return report.fail(reason, &mut watch),
        };
        report.initial_residual_norms = report.residual_norms.clone();
        let min_iterations = self.config.min_iterations.max(1);

        for iteration in 1..=self.config.max_iterations {
            let outcome = self.linear.solve(&lin.jacobian, &lin.residual);
            report.linear_iterations += outcome.iterations;
            if !outcome.success {
                return report.fail(NonConvergence::LinearSolveFailed, &mut watch);
            }

            self.apply_update(&mut state.unknowns, &outcome.update);
            report.iteration_count = iteration;
            if state.unknowns.iter().any(|v| !v.is_finite()) {
                return report.fail(NonConvergence::NonFinite, &mut watch);
            }

            let switched_wells = self.update_wells(assembler, state, iteration);
            let well_switched = !switched_wells.is_empty();
            report.switch_count += switched_wells.len();
            report.well_switched |= well_switched;

            lin = match self.linearize(assembler, state, dt, &mut report) {
                Ok(lin) => lin,
                Err(reason) => return report.fail(reason, &mut watch),
            };

            debug!(
                iteration,
                norms = ?report.residual_norms,
                switched = switched_wells.len(),
                "newton iteration"
            );
            report.iterations.push(IterationRecord {
                iteration,
                residual_norms: report.residual_norms.clone(),
                linear_iterations: outcome.iterations,
                well_switched,
                switched_wells,
            });

            let tol = self.config.switching.tolerance;
            if !well_switched
                && iteration >= min_iterations
                && self.config.converged(&report.residual_norms)
                && state.wells.iter().all(|w| w.satisfies_limits(tol))
            {
                report.converged = true;
                watch.stop();
                report.wall_time_s = watch.total_seconds();
                return report;
            }
        }

        report.fail(NonConvergence::IterationLimit, &mut watch)
    }

    fn linearize<A: Assembler + ?Sized>(
        &self,
        assembler: &A,
        state: &ModelState,
        dt: f64,
        report: &mut ConvergenceReport,
    ) -> Result<Linearization, NonConvergence> {
        let lin = assembler
            .assemble(state, dt)
            .map_err(|e| NonConvergence::AssemblyFailed(e.to_string()))?;
        report.linearizations += 1;
        let norms = assembler.residual_norms(&lin.residual);
        if norms.iter().any(|n| !n.is_finite()) {
            report.residual_norms = norms;
            return Err(NonConvergence::NonFinite);
        }
        report.residual_norms = norms;
        Ok(lin)
    }

    /// `x -= relaxation * update`, each change clamped to `max_change` and
    /// the result floored at `min_value`.
    fn apply_update(&self, x: &mut DVector<f64>, update: &DVector<f64>) {
        let w = self.config.relaxation;
        for (xi, di) in x.iter_mut().zip(update.iter()) {
            let mut step = w * di;
            if let Some(limit) = self.config.max_change {
                step = step.clamp(-limit, limit);
            }
            *xi -= step;
            if let Some(floor) = self.config.min_value {
                *xi = xi.max(floor);
            }
        }
    }

    /// Evaluate every well at the new iterate and record its rates/BHP
    /// under the control it ends the iteration on.
    fn update_wells<A: Assembler + ?Sized>(
        &mut self,
        assembler: &A,
        state: &mut ModelState,
        iteration: usize,
    ) -> Vec<WellId> {
        let proposals: Vec<_> = state
            .wells
            .iter()
            .map(|w| assembler.well_solution(state, w))
            .collect();
        let mut switched = Vec::new();
        for (well, proposal) in state.wells.iter_mut().zip(&proposals) {
            if self.well_control.evaluate(well, proposal, iteration).switched() {
                switched.push(well.id);
            }
        }
        for i in 0..state.wells.len() {
            let solution = if switched.contains(&state.wells[i].id) {
                assembler.well_solution(state, &state.wells[i])
            } else {
                proposals[i]
            };
            state.wells[i].record_solution(&solution);
        }
        switched
    }
}
