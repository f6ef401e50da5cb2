//! rf-core: stable foundation for resflow.
//!
//! Contains:
//! - units (uom SI types + field-unit constructors)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact well ids)
//! - timing (wall-clock stopwatch for report statistics)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use timing::Stopwatch;
pub use units::*;
