//! Attraction controller.
//!
//! Pure functions that turn a body's kinematic state into the acceleration a
//! well imparts on it for one step. Nothing here talks to the host; the
//! driver in [`crate::step`] issues the wake and force commands.
//!
//! The controller is a proportional-derivative pull toward the center:
//!
//! - radial gain `Kp` interpolated between the inner and outer boundary
//!   (stronger at range, softer near the core),
//! - damping on the closing speed, floored at a minimum inward pull,
//! - damping on the tangential velocity so bodies fall in instead of orbiting,
//! - an upward term that cancels part of gravity (and of the well's own
//!   downward pull) so bodies are not pinned to the floor under the center.

use glam::Vec3;

use crate::body::BodySnapshot;
use crate::well::Well;

/// Bodies closer than this to the center have no usable direction.
pub const DEGENERATE_DISTANCE: f32 = 1e-3;

/// Tangential speeds at or below this are not damped.
pub const TANGENTIAL_EPSILON: f32 = 1e-4;

/// Why a body received no force this step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Skip {
    /// Host does not simulate physics for the body.
    NotSimulated,
    /// Body was consumed earlier.
    Consumed,
    /// Position, velocity or gravity scale is not finite.
    InvalidState,
    /// Body sits on the center; direction is undefined.
    Degenerate,
}

/// Acceleration imparted on one body for one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttractionForce {
    /// Pull toward the center.
    pub radial: Vec3,
    /// Damping against tangential velocity.
    pub tangential: Vec3,
    /// Upward gravity compensation.
    pub vertical: Vec3,
    /// Distance from the body to the center.
    pub distance: f32,
    /// Normalized radial position, 0 at the inner boundary and 1 at the outer.
    pub t: f32,
    /// Interpolated radial gain.
    pub kp: f32,
    /// Magnitude of `radial`.
    pub radial_accel: f32,
    /// Velocity along the direction to the center (positive = closing).
    pub radial_speed: f32,
}

impl AttractionForce {
    /// Sum of all components.
    #[must_use]
    pub fn total(&self) -> Vec3 {
        self.radial + self.tangential + self.vertical
    }
}

/// Linear interpolation from `a` (x = 0) to `b` (x = 1).
#[must_use]
pub fn lerp(a: f32, b: f32, x: f32) -> f32 {
    a + (b - a) * x
}

/// Normalized radial position of a body at `distance` from the center.
///
/// Clamped to `[0, 1]` for bodies inside the inner or beyond the outer
/// boundary.
#[must_use]
pub fn interpolation_t(well: &Well, distance: f32) -> f32 {
    ((distance - well.inner_radius()) / well.radial_span()).clamp(0.0, 1.0)
}

/// Radial gain at normalized position `t`.
#[must_use]
pub fn radial_gain(well: &Well, t: f32) -> f32 {
    let tuning = well.tuning();
    lerp(tuning.kp_inner, tuning.kp_outer, t)
}

/// Radial acceleration for gain `kp` and closing speed `radial_speed`,
/// floored at the minimum inward pull.
#[must_use]
pub fn radial_acceleration(well: &Well, kp: f32, radial_speed: f32) -> f32 {
    let tuning = well.tuning();
    (kp - tuning.kd_radial * radial_speed).max(tuning.min_radial_accel)
}

/// Compute the acceleration `well` imparts on `body`.
///
/// `gravity` is the host's world gravity; only its magnitude is used.
pub fn compute_attraction(
    well: &Well,
    body: &BodySnapshot,
    gravity: Vec3,
) -> Result<AttractionForce, Skip> {
    if body.status.is_consumed() {
        return Err(Skip::Consumed);
    }
    if !body.simulated {
        return Err(Skip::NotSimulated);
    }
    if !body.is_finite() {
        return Err(Skip::InvalidState);
    }

    let to_center = well.center() - body.position;
    let distance = to_center.length();
    if distance < DEGENERATE_DISTANCE {
        return Err(Skip::Degenerate);
    }
    let dir = to_center / distance;

    // Split velocity into closing speed and tangential part.
    let radial_speed = body.velocity.dot(dir);
    let tangential_velocity = body.velocity - dir * radial_speed;

    let t = interpolation_t(well, distance);
    let kp = radial_gain(well, t);
    let radial_accel = radial_acceleration(well, kp, radial_speed);

    let tuning = well.tuning();
    let radial = dir * radial_accel;

    let tangential = if tangential_velocity.length() > TANGENTIAL_EPSILON {
        -tangential_velocity * tuning.tangential_damping
    } else {
        Vec3::ZERO
    };

    let vertical = if body.gravity_enabled {
        let up = well.up();
        let gravity_magnitude = gravity.length() * body.gravity_scale;
        // Extra downward pull from the well when the center is below the body.
        let well_down = (-dir.dot(up)).max(0.0) * radial_accel;
        let up_scale = lerp(tuning.gravity_cancel_inner, tuning.gravity_cancel_outer, t);
        let compensation = (gravity_magnitude + well_down) * up_scale;
        if compensation > 0.0 {
            up * compensation
        } else {
            Vec3::ZERO
        }
    } else {
        Vec3::ZERO
    };

    Ok(AttractionForce {
        radial,
        tangential,
        vertical,
        distance,
        t,
        kp,
        radial_accel,
        radial_speed,
    })
}
