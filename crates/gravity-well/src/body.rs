//! Body handles and per-step kinematic snapshots.

use std::fmt;

use glam::Vec3;

/// Opaque handle to a host-owned body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Consumption state of a body.
///
/// `Consumed` is terminal; nothing in this crate moves a body back to
/// `Active`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyStatus {
    #[default]
    Active,
    Consumed,
}

impl BodyStatus {
    /// Transition `Active -> Consumed`.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn consume(&mut self) -> bool {
        match self {
            BodyStatus::Active => {
                *self = BodyStatus::Consumed;
                true
            }
            BodyStatus::Consumed => false,
        }
    }

    #[must_use]
    pub fn is_consumed(self) -> bool {
        self == BodyStatus::Consumed
    }
}

/// Read-only view of a body for one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Whether the host simulates physics for this body.
    pub simulated: bool,
    /// Whether world gravity acts on this body.
    pub gravity_enabled: bool,
    /// Multiplier on world gravity for this body.
    pub gravity_scale: f32,
    pub status: BodyStatus,
}

impl BodySnapshot {
    /// A simulated, gravity-enabled, active body at rest.
    #[must_use]
    pub fn new(id: BodyId, position: Vec3) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            simulated: true,
            gravity_enabled: true,
            gravity_scale: 1.0,
            status: BodyStatus::Active,
        }
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, enabled: bool) -> Self {
        self.gravity_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_simulated(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: BodyStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the kinematic state can be used at all.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.gravity_scale.is_finite()
    }
}
