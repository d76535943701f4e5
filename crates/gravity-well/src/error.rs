//! Error types for the gravity-well crate.

use std::fmt;

/// Result type for gravity-well operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring a well.
///
/// Per-step conditions (invalid handles, degenerate distances, repeated
/// consumption events) are never errors; they are skipped and logged.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Well geometry is unusable.
    InvalidGeometry {
        /// Description of what was invalid.
        detail: String,
    },
    /// A tuning parameter is not a finite number.
    InvalidTuning {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The rejected value.
        value: f32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidGeometry { detail } => write!(f, "invalid well geometry: {detail}"),
            Error::InvalidTuning { parameter, value } => {
                write!(f, "invalid tuning parameter {parameter}: {value}")
            }
        }
    }
}

impl std::error::Error for Error {}
