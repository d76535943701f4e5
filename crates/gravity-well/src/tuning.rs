//! Controller tuning parameters.
//!
//! All gains are accelerations (or acceleration per unit speed), so a well
//! imparts the same motion on every body regardless of its mass.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tuning for the attraction controller.
///
/// Missing fields in a serialized tuning file fall back to the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellTuning {
    /// Radial gain at the inner boundary (t = 0).
    pub kp_inner: f32,
    /// Radial gain at the outer boundary (t = 1).
    pub kp_outer: f32,
    /// Damping on the closing (inward) radial speed.
    pub kd_radial: f32,
    /// Floor on the inward radial acceleration.
    pub min_radial_accel: f32,
    /// Damping applied against tangential velocity.
    pub tangential_damping: f32,
    /// Fraction of gravity cancelled at the inner boundary.
    pub gravity_cancel_inner: f32,
    /// Fraction of gravity cancelled at the outer boundary.
    pub gravity_cancel_outer: f32,
}

impl Default for WellTuning {
    fn default() -> Self {
        Self {
            kp_inner: 1200.0,
            kp_outer: 5000.0,
            kd_radial: 2.0,
            min_radial_accel: 200.0,
            tangential_damping: 1.5,
            gravity_cancel_inner: 0.4,
            gravity_cancel_outer: 1.0,
        }
    }
}

/// Recommended operating range for one tuning parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuningRange {
    pub parameter: &'static str,
    pub min: f32,
    pub max: f32,
}

impl TuningRange {
    const fn new(parameter: &'static str, min: f32, max: f32) -> Self {
        Self {
            parameter,
            min,
            max,
        }
    }

    /// Whether `value` lies inside the range (inclusive).
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// A parameter that lies outside its recommended range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutOfRange {
    pub range: TuningRange,
    pub value: f32,
}

impl WellTuning {
    /// Recommended ranges, in the same order as [`WellTuning::values`].
    pub const RANGES: [TuningRange; 7] = [
        TuningRange::new("kp_inner", 500.0, 2000.0),
        TuningRange::new("kp_outer", 3000.0, 15000.0),
        TuningRange::new("kd_radial", 0.5, 4.0),
        TuningRange::new("min_radial_accel", 50.0, 600.0),
        TuningRange::new("tangential_damping", 0.0, 3.0),
        TuningRange::new("gravity_cancel_inner", 0.0, 0.7),
        TuningRange::new("gravity_cancel_outer", 0.7, 1.2),
    ];

    /// Parameter values, in the same order as [`WellTuning::RANGES`].
    #[must_use]
    pub fn values(&self) -> [f32; 7] {
        [
            self.kp_inner,
            self.kp_outer,
            self.kd_radial,
            self.min_radial_accel,
            self.tangential_damping,
            self.gravity_cancel_inner,
            self.gravity_cancel_outer,
        ]
    }

    /// Reject non-finite parameters.
    pub fn validate(&self) -> Result<()> {
        for (range, value) in Self::RANGES.iter().zip(self.values()) {
            if !value.is_finite() {
                return Err(Error::InvalidTuning {
                    parameter: range.parameter,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Parameters outside their recommended range.
    ///
    /// Out-of-range values are allowed; callers decide whether to warn.
    #[must_use]
    pub fn out_of_range(&self) -> Vec<OutOfRange> {
        Self::RANGES
            .iter()
            .zip(self.values())
            .filter(|(range, value)| !range.contains(*value))
            .map(|(range, value)| OutOfRange {
                range: *range,
                value,
            })
            .collect()
    }
}
