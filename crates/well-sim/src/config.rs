//! Tuning file loading.
//!
//! Tuning files are JSON objects whose keys are [`WellTuning`] field names.
//! Missing keys keep their defaults.

use std::{fs, path::Path};

use gravity_well::WellTuning;

use crate::error::{Result, SimError};

/// Read and validate a tuning file.
pub fn load_tuning(path: &Path) -> Result<WellTuning> {
    let text = fs::read_to_string(path).map_err(|e| SimError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_tuning(&text).map_err(|message| SimError::Config {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse and validate tuning JSON.
pub fn parse_tuning(text: &str) -> std::result::Result<WellTuning, String> {
    let tuning: WellTuning = serde_json::from_str(text).map_err(|e| e.to_string())?;
    tuning.validate().map_err(|e| e.to_string())?;
    Ok(tuning)
}
