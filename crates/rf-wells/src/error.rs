//! Error types for well control operations.

use thiserror::Error;

/// Result type for well operations.
pub type WellResult<T> = Result<T, WellError>;

/// Errors raised while configuring wells or applying schedule events.
///
/// Limit violations found during Newton iterations are not errors; they are
/// resolved by switching control modes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WellError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown well: {name}")]
    UnknownWell { name: String },

    #[error("Group has no wells: {name}")]
    UnknownGroup { name: String },

    #[error("Control {mode} is not valid for {well}: {reason}")]
    InvalidControl {
        well: String,
        mode: String,
        reason: &'static str,
    },
}
