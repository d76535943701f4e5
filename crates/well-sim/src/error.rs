//! Error types for the sandbox.

use std::{fmt, path::PathBuf};

/// Result type for sandbox operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while setting up a sandbox run.
#[derive(Debug)]
pub enum SimError {
    /// A configuration file could not be read or parsed.
    Config { path: PathBuf, message: String },
    /// The telemetry destination could not be opened.
    Telemetry { path: PathBuf, source: std::io::Error },
    /// The well rejected its geometry or tuning.
    Well(gravity_well::Error),
    /// A run parameter is unusable.
    InvalidArgument(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config { path, message } => {
                write!(f, "config error in {}: {message}", path.display())
            }
            SimError::Telemetry { path, source } => {
                write!(f, "cannot open telemetry file {}: {source}", path.display())
            }
            SimError::Well(e) => write!(f, "{e}"),
            SimError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Telemetry { source, .. } => Some(source),
            SimError::Well(e) => Some(e),
            _ => None,
        }
    }
}

impl From<gravity_well::Error> for SimError {
    fn from(e: gravity_well::Error) -> Self {
        SimError::Well(e)
    }
}
