//! Well geometry and configuration.

use glam::Vec3;

use crate::error::{Error, Result};
use crate::tuning::WellTuning;

/// Floor on `outer_radius - inner_radius` when used as a divisor.
pub const RADIAL_SPAN_EPSILON: f32 = 1e-3;

/// Default scale applied to the outer radius for the fallback query.
pub const DEFAULT_FALLBACK_RADIUS_SCALE: f32 = 4.0;

/// The attraction source.
///
/// Bodies inside `outer_radius` are pulled toward `center`; bodies that reach
/// `inner_radius` are consumed. The vertical axis for gravity compensation is
/// `up`, `+Z` unless overridden.
#[derive(Clone, Debug, PartialEq)]
pub struct Well {
    center: Vec3,
    outer_radius: f32,
    inner_radius: f32,
    up: Vec3,
    fallback_radius_scale: f32,
    tuning: WellTuning,
}

impl Well {
    /// Create a well with default tuning.
    pub fn new(center: Vec3, outer_radius: f32, inner_radius: f32) -> Result<Self> {
        Self::with_tuning(center, outer_radius, inner_radius, WellTuning::default())
    }

    /// Create a well with explicit tuning.
    pub fn with_tuning(
        center: Vec3,
        outer_radius: f32,
        inner_radius: f32,
        tuning: WellTuning,
    ) -> Result<Self> {
        if !center.is_finite() {
            return Err(Error::InvalidGeometry {
                detail: format!("center {center} is not finite"),
            });
        }
        if !outer_radius.is_finite() || !inner_radius.is_finite() || inner_radius < 0.0 {
            return Err(Error::InvalidGeometry {
                detail: format!("radii must be finite and non-negative, got inner {inner_radius} outer {outer_radius}"),
            });
        }
        if inner_radius >= outer_radius {
            return Err(Error::InvalidGeometry {
                detail: format!(
                    "inner radius {inner_radius} must be less than outer radius {outer_radius}"
                ),
            });
        }
        tuning.validate()?;

        Ok(Self {
            center,
            outer_radius,
            inner_radius,
            up: Vec3::Z,
            fallback_radius_scale: DEFAULT_FALLBACK_RADIUS_SCALE,
            tuning,
        })
    }

    /// Override the vertical axis used for gravity compensation.
    pub fn with_up(mut self, up: Vec3) -> Result<Self> {
        let Some(up) = up.try_normalize() else {
            return Err(Error::InvalidGeometry {
                detail: format!("up axis {up} has no direction"),
            });
        };
        self.up = up;
        Ok(self)
    }

    /// Override the scale applied to the outer radius for the fallback query.
    ///
    /// Scales below 1 are raised to 1; the fallback never searches a smaller
    /// sphere than the primary query.
    #[must_use]
    pub fn with_fallback_radius_scale(mut self, scale: f32) -> Self {
        self.fallback_radius_scale = if scale.is_finite() { scale.max(1.0) } else { 1.0 };
        self
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn outer_radius(&self) -> f32 {
        self.outer_radius
    }

    pub fn inner_radius(&self) -> f32 {
        self.inner_radius
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn tuning(&self) -> &WellTuning {
        &self.tuning
    }

    /// Radius of the fallback candidate query.
    pub fn fallback_radius(&self) -> f32 {
        self.outer_radius * self.fallback_radius_scale
    }

    /// `outer_radius - inner_radius`, floored at [`RADIAL_SPAN_EPSILON`].
    pub fn radial_span(&self) -> f32 {
        (self.outer_radius - self.inner_radius).max(RADIAL_SPAN_EPSILON)
    }

    /// Replace the tuning between steps.
    ///
    /// Parameters outside their recommended ranges are accepted and logged.
    pub fn set_tuning(&mut self, tuning: WellTuning) -> Result<()> {
        tuning.validate()?;
        for entry in tuning.out_of_range() {
            tracing::warn!(
                "Tuning {} = {} is outside the recommended range {}..={}",
                entry.range.parameter,
                entry.value,
                entry.range.min,
                entry.range.max
            );
        }
        self.tuning = tuning;
        Ok(())
    }

    /// Move the well between steps.
    pub fn set_center(&mut self, center: Vec3) -> Result<()> {
        if !center.is_finite() {
            return Err(Error::InvalidGeometry {
                detail: format!("center {center} is not finite"),
            });
        }
        self.center = center;
        Ok(())
    }

    /// Whether `point` lies within the outer radius.
    pub fn contains(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.outer_radius * self.outer_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_radii() {
        assert!(Well::new(Vec3::ZERO, 1000.0, 1.0).is_ok());
        assert!(matches!(
            Well::new(Vec3::ZERO, 10.0, 10.0),
            Err(Error::InvalidGeometry { .. })
        ));
        assert!(matches!(
            Well::new(Vec3::ZERO, 10.0, 20.0),
            Err(Error::InvalidGeometry { .. })
        ));
        assert!(matches!(
            Well::new(Vec3::ZERO, f32::NAN, 1.0),
            Err(Error::InvalidGeometry { .. })
        ));
        assert!(matches!(
            Well::new(Vec3::new(f32::INFINITY, 0.0, 0.0), 10.0, 1.0),
            Err(Error::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_new_validates_tuning() {
        let tuning = WellTuning {
            kp_outer: f32::NAN,
            ..WellTuning::default()
        };
        assert!(matches!(
            Well::with_tuning(Vec3::ZERO, 100.0, 1.0, tuning),
            Err(Error::InvalidTuning {
                parameter: "kp_outer",
                ..
            })
        ));
    }

    #[test]
    fn test_radial_span_floor() {
        let well = Well::new(Vec3::ZERO, 1.000_1, 1.0).unwrap();
        assert!((well.radial_span() - RADIAL_SPAN_EPSILON).abs() < 1e-6);

        let well = Well::new(Vec3::ZERO, 1000.0, 1.0).unwrap();
        assert!((well.radial_span() - 999.0).abs() < 1e-3);
    }

    #[test]
    fn test_with_up_normalizes() {
        let well = Well::new(Vec3::ZERO, 10.0, 1.0)
            .unwrap()
            .with_up(Vec3::new(0.0, 3.0, 0.0))
            .unwrap();
        assert!((well.up() - Vec3::Y).length() < 1e-6);

        let result = Well::new(Vec3::ZERO, 10.0, 1.0).unwrap().with_up(Vec3::ZERO);
        assert!(result.is_err());
    }

    #[test]
    fn test_fallback_radius() {
        let well = Well::new(Vec3::ZERO, 100.0, 1.0).unwrap();
        assert!((well.fallback_radius() - 400.0).abs() < 1e-3);

        let well = well.with_fallback_radius_scale(0.5);
        assert!((well.fallback_radius() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_set_tuning_between_steps() {
        let mut well = Well::new(Vec3::ZERO, 100.0, 1.0).unwrap();
        let tuning = WellTuning {
            kp_inner: 50.0,
            ..WellTuning::default()
        };
        well.set_tuning(tuning).unwrap();
        assert!((well.tuning().kp_inner - 50.0).abs() < f32::EPSILON);

        let bad = WellTuning {
            min_radial_accel: f32::NEG_INFINITY,
            ..WellTuning::default()
        };
        assert!(well.set_tuning(bad).is_err());
        assert!((well.tuning().kp_inner - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_contains() {
        let well = Well::new(Vec3::new(0.0, 0.0, 100.0), 50.0, 1.0).unwrap();
        assert!(well.contains(Vec3::new(0.0, 0.0, 60.0)));
        assert!(well.contains(Vec3::new(50.0, 0.0, 100.0)));
        assert!(!well.contains(Vec3::new(0.0, 0.0, 10.0)));
    }
}
