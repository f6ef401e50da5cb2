//! Error types for the rf-app service layer.

/// Application error type wrapping the backend crates' errors behind one
/// interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Case compilation failed: {0}")]
    Compile(String),

    #[error("Well error: {0}")]
    Well(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<rf_project::ProjectError> for AppError {
    fn from(err: rf_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<rf_wells::WellError> for AppError {
    fn from(err: rf_wells::WellError) -> Self {
        AppError::Well(err.to_string())
    }
}

impl From<rf_solver::SolverError> for AppError {
    fn from(err: rf_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<rf_sim::SimError> for AppError {
    fn from(err: rf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<rf_results::ResultsError> for AppError {
    fn from(err: rf_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
