//! Sandbox host world.
//!
//! A minimal point-mass world standing in for a game engine: gravity, a
//! ground plane, sleeping, radius queries, and swept inner-region overlap
//! events. Bodies are never removed; consumed bodies stay in the world as
//! inert entries so their handles remain valid.

use std::collections::HashSet;

use glam::Vec3;
use gravity_well::{
    BodyId, BodySnapshot, BodyStatus, BoundaryEvent, SimulationHost, consumption::CONSUMED_TAG,
};

/// Speed below which a body counts as still.
const SLEEP_SPEED: f32 = 1.0;

/// Time a body must stay still before it falls asleep (seconds).
const SLEEP_DELAY: f32 = 0.5;

/// A body in the sandbox.
#[derive(Clone, Debug)]
pub struct SandboxBody {
    pub id: BodyId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub simulated: bool,
    pub gravity_enabled: bool,
    pub gravity_scale: f32,
    pub visible: bool,
    pub collision_enabled: bool,
    pub tick_enabled: bool,
    pub asleep: bool,
    /// Steps this body's own update has run.
    pub ticks: u64,
    pub tags: HashSet<String>,
    still_time: f32,
    pending_acceleration: Vec3,
    inside_inner: bool,
}

impl SandboxBody {
    fn new(id: BodyId, position: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            position,
            velocity,
            simulated: true,
            gravity_enabled: true,
            gravity_scale: 1.0,
            visible: true,
            collision_enabled: true,
            tick_enabled: true,
            asleep: false,
            ticks: 0,
            tags: HashSet::new(),
            still_time: 0.0,
            pending_acceleration: Vec3::ZERO,
            inside_inner: false,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.tags.contains(CONSUMED_TAG)
    }

    fn snapshot(&self) -> BodySnapshot {
        BodySnapshot {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            simulated: self.simulated,
            gravity_enabled: self.gravity_enabled,
            gravity_scale: self.gravity_scale,
            status: if self.is_consumed() {
                BodyStatus::Consumed
            } else {
                BodyStatus::Active
            },
        }
    }
}

/// Sphere that raises inner-region events.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InnerRegion {
    pub center: Vec3,
    pub radius: f32,
}

impl InnerRegion {
    /// Whether a collidable body is inside the sphere.
    fn overlaps(&self, body: &SandboxBody) -> bool {
        body.collision_enabled && body.position.distance(self.center) <= self.radius
    }
}

/// The sandbox world.
#[derive(Debug)]
pub struct SandboxWorld {
    bodies: Vec<SandboxBody>,
    next_id: u64,
    gravity: Vec3,
    /// Height of the ground plane, if any.
    ground: Option<f32>,
    inner_region: Option<InnerRegion>,
    events: Vec<BoundaryEvent>,
}

impl SandboxWorld {
    /// Create a world with the given gravity and a ground plane at `z = 0`.
    pub fn new(gravity: Vec3) -> Self {
        Self {
            bodies: Vec::new(),
            next_id: 0,
            gravity,
            ground: Some(0.0),
            inner_region: None,
            events: Vec::new(),
        }
    }

    /// Remove the ground plane.
    #[must_use]
    pub fn without_ground(mut self) -> Self {
        self.ground = None;
        self
    }

    /// Register the sphere that raises inner-region events.
    ///
    /// Collidable bodies already inside raise `Entered` immediately, like an
    /// engine's initial-overlap begin event.
    pub fn set_inner_region(&mut self, center: Vec3, radius: f32) {
        let region = InnerRegion { center, radius };
        self.inner_region = Some(region);
        for body in &mut self.bodies {
            let inside = region.overlaps(body);
            if inside && !body.inside_inner {
                self.events.push(BoundaryEvent::Entered(body.id));
            }
            body.inside_inner = inside;
        }
    }

    /// Add a simulated body.
    pub fn spawn(&mut self, position: Vec3, velocity: Vec3) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;

        let mut body = SandboxBody::new(id, position, velocity);
        if let Some(region) = self.inner_region {
            body.inside_inner = region.overlaps(&body);
            if body.inside_inner {
                self.events.push(BoundaryEvent::Entered(id));
            }
        }
        self.bodies.push(body);
        id
    }

    // Ids are indices into `bodies`; bodies are never removed.
    pub fn body(&self, id: BodyId) -> Option<&SandboxBody> {
        usize::try_from(id.0).ok().and_then(|i| self.bodies.get(i))
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut SandboxBody> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.bodies.get_mut(i))
    }

    pub fn bodies(&self) -> &[SandboxBody] {
        &self.bodies
    }

    /// Advance the world by `dt` seconds.
    pub fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        let ground = self.ground;
        let region = self.inner_region;

        for body in &mut self.bodies {
            let acceleration = std::mem::take(&mut body.pending_acceleration);

            if body.tick_enabled {
                body.ticks += 1;
            }
            if !body.simulated || body.asleep {
                continue;
            }

            // Semi-implicit Euler.
            let mut total = acceleration;
            if body.gravity_enabled {
                total += gravity * body.gravity_scale;
            }
            body.velocity += total * dt;
            let previous = body.position;
            body.position += body.velocity * dt;

            if let Some(ground) = ground {
                if body.position.z < ground {
                    body.position.z = ground;
                    body.velocity.z = body.velocity.z.max(0.0);
                }
            }

            // Sleep once resting with nothing pushing the body.
            if body.velocity.length() < SLEEP_SPEED && acceleration == Vec3::ZERO {
                body.still_time += dt;
                if body.still_time >= SLEEP_DELAY {
                    body.asleep = true;
                    body.velocity = Vec3::ZERO;
                    tracing::trace!("{} fell asleep", body.id);
                }
            } else {
                body.still_time = 0.0;
            }

            let Some(region) = region else {
                continue;
            };
            if body.collision_enabled {
                let inside = body.position.distance(region.center) <= region.radius;
                // Swept test so fast bodies cannot tunnel through a small region.
                let touched = inside
                    || segment_hits_sphere(previous, body.position, region.center, region.radius);
                if touched && !body.inside_inner {
                    self.events.push(BoundaryEvent::Entered(body.id));
                }
                if !inside && (touched || body.inside_inner) {
                    self.events.push(BoundaryEvent::Exited(body.id));
                }
                body.inside_inner = inside;
            }
        }
    }

    /// Number of bodies that are not consumed.
    pub fn active_count(&self) -> usize {
        self.bodies.iter().filter(|b| !b.is_consumed()).count()
    }
}

/// Whether the segment `a..b` passes within `radius` of `center`.
pub fn segment_hits_sphere(a: Vec3, b: Vec3, center: Vec3, radius: f32) -> bool {
    let ab = b - a;
    let length_sq = ab.length_squared();
    let s = if length_sq > 0.0 {
        ((center - a).dot(ab) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (a + ab * s).distance_squared(center) <= radius * radius
}

impl SimulationHost for SandboxWorld {
    fn bodies_within(&self, center: Vec3, radius: f32) -> Vec<BodyId> {
        let radius_sq = radius * radius;
        self.bodies
            .iter()
            .filter(|b| b.simulated && b.position.distance_squared(center) <= radius_sq)
            .map(|b| b.id)
            .collect()
    }

    fn snapshot(&self, id: BodyId) -> Option<BodySnapshot> {
        self.body(id).map(SandboxBody::snapshot)
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn wake(&mut self, id: BodyId) {
        if let Some(body) = self.body_mut(id) {
            body.asleep = false;
            body.still_time = 0.0;
        }
    }

    fn apply_acceleration(&mut self, id: BodyId, acceleration: Vec3) {
        if let Some(body) = self.body_mut(id) {
            if !body.asleep {
                body.pending_acceleration += acceleration;
            }
        }
    }

    fn drain_boundary_events(&mut self) -> Vec<BoundaryEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_visible(&mut self, id: BodyId, visible: bool) {
        if let Some(body) = self.body_mut(id) {
            body.visible = visible;
        }
    }

    fn set_collision_enabled(&mut self, id: BodyId, enabled: bool) {
        if let Some(body) = self.body_mut(id) {
            body.collision_enabled = enabled;
        }
    }

    fn set_simulate_physics(&mut self, id: BodyId, simulate: bool) {
        if let Some(body) = self.body_mut(id) {
            body.simulated = simulate;
            if !simulate {
                body.velocity = Vec3::ZERO;
            }
        }
    }

    fn set_tick_enabled(&mut self, id: BodyId, enabled: bool) {
        if let Some(body) = self.body_mut(id) {
            body.tick_enabled = enabled;
        }
    }

    fn mark_consumed(&mut self, id: BodyId) -> bool {
        self.body_mut(id)
            .is_some_and(|body| body.tags.insert(CONSUMED_TAG.to_string()))
    }
}
