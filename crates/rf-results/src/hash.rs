//! Content-based hashing for run IDs.

use rf_project::Case;
use sha2::{Digest, Sha256};

/// Run id of `case` solved by `solver_version`: a hex SHA-256 over the
/// case's JSON form and the version string.
pub fn compute_run_id(case: &Case, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let case_json = serde_json::to_string(case).unwrap_or_default();
    hasher.update(case_json.as_bytes());
    hasher.update(solver_version.as_bytes());

    format!("{:x}", hasher.finalize())
}
