//! Scenario spawning.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::world::SandboxWorld;

/// How bodies are placed around the well.
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
pub enum Scenario {
    /// Bodies at rest, scattered through the outer sphere above ground.
    #[default]
    Scatter,
    /// Bodies on a ring with tangential velocity, so they start out orbiting.
    Orbit,
    /// Bodies beyond the outer radius, only reachable by the fallback query.
    Outside,
}

/// Parameters for spawning a scenario.
#[derive(Clone, Copy, Debug)]
pub struct SpawnParams {
    pub scenario: Scenario,
    pub count: usize,
    pub seed: u64,
    pub center: Vec3,
    pub outer_radius: f32,
    pub inner_radius: f32,
    /// Speed of orbiting bodies.
    pub orbit_speed: f32,
}

/// Populate `world` with bodies for `params.scenario`.
pub fn spawn(world: &mut SandboxWorld, params: &SpawnParams) {
    let mut rng = StdRng::seed_from_u64(params.seed);

    for i in 0..params.count {
        let (position, velocity) = match params.scenario {
            Scenario::Scatter => (random_in_shell(&mut rng, params, 0.2, 1.0, false), Vec3::ZERO),
            Scenario::Orbit => {
                #[allow(clippy::cast_precision_loss)]
                let angle = i as f32 / params.count.max(1) as f32 * TAU;
                let radius = params.outer_radius * rng.random_range(0.5..0.9);
                let offset = Vec3::new(angle.cos(), angle.sin(), 0.0) * radius;
                // Counter-clockwise around the vertical axis.
                let tangent = Vec3::new(-angle.sin(), angle.cos(), 0.0);
                (params.center + offset, tangent * params.orbit_speed)
            }
            Scenario::Outside => (random_in_shell(&mut rng, params, 1.2, 2.5, true), Vec3::ZERO),
        };
        let id = world.spawn(position, velocity);
        tracing::trace!("Spawned {id} at {position}");
    }
}

/// Random point between `min_scale` and `max_scale` outer radii from the
/// center, kept above the ground plane.
///
/// With `upper_only` the point is never below the center, so clamping to the
/// ground cannot pull it closer to the well.
fn random_in_shell(
    rng: &mut StdRng,
    params: &SpawnParams,
    min_scale: f32,
    max_scale: f32,
    upper_only: bool,
) -> Vec3 {
    let direction = loop {
        let mut candidate = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        if upper_only {
            candidate.z = candidate.z.abs();
        }
        if let Some(direction) = candidate.try_normalize() {
            break direction;
        }
    };
    let max = params.outer_radius * max_scale;
    // Keep clear of the inner region, but never past the shell's far edge.
    let floor = (params.inner_radius * 2.0).min((params.inner_radius + max) * 0.5);
    let min = (params.outer_radius * min_scale).max(floor).min(max);
    let mut position = params.center + direction * rng.random_range(min..=max);
    position.z = position.z.max(0.0);
    position
}
