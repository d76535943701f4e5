//! Interface to the host simulation.
//!
//! The host owns bodies, integrates physics, detects overlaps and renders.
//! A well only reads body state through this trait and issues commands back
//! through it.

use glam::Vec3;

use crate::body::{BodyId, BodySnapshot};

/// Inner-region overlap transition for one body.
///
/// Hosts deliver one event per physical transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryEvent {
    Entered(BodyId),
    Exited(BodyId),
}

/// Host simulation capabilities consumed by a well.
pub trait SimulationHost {
    /// Physically simulated bodies within `radius` of `center`.
    ///
    /// Hosts may return duplicates; the driver removes them.
    fn bodies_within(&self, center: Vec3, radius: f32) -> Vec<BodyId>;

    /// Current state of a body, or `None` if the handle is no longer valid.
    fn snapshot(&self, id: BodyId) -> Option<BodySnapshot>;

    /// World gravity acceleration.
    fn gravity(&self) -> Vec3;

    /// Make sure the body is awake in the physics system.
    fn wake(&mut self, id: BodyId);

    /// Apply a mass-independent acceleration for this step.
    fn apply_acceleration(&mut self, id: BodyId, acceleration: Vec3);

    /// Take the inner-region events raised since the last call.
    fn drain_boundary_events(&mut self) -> Vec<BoundaryEvent>;

    fn set_visible(&mut self, id: BodyId, visible: bool);

    fn set_collision_enabled(&mut self, id: BodyId, enabled: bool);

    fn set_simulate_physics(&mut self, id: BodyId, simulate: bool);

    /// Enable or disable the body's own per-step update.
    fn set_tick_enabled(&mut self, id: BodyId, enabled: bool);

    /// Mark the body consumed.
    ///
    /// Returns `true` only if the body was not consumed before.
    fn mark_consumed(&mut self, id: BodyId) -> bool;
}
