//! Headless sandbox for gravity-well attraction.
//!
//! Spawns a scenario into a [`SandboxWorld`], drives a [`WellDriver`] at a
//! fixed step rate, and reports per-step telemetry and a run summary.

pub mod config;
pub mod error;
pub mod scenario;
pub mod telemetry;
pub mod world;

use std::collections::BTreeMap;

use glam::Vec3;
use gravity_well::{BodyId, StepOutput, Well, WellDriver, WellTuning};
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::scenario::SpawnParams;
use crate::telemetry::{TelemetryOutput, TelemetrySnapshot, emit_telemetry_to, reset_telemetry_to};
use crate::world::SandboxWorld;

/// Everything needed to set up a run.
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub spawn: SpawnParams,
    /// Downward gravity magnitude.
    pub gravity: f32,
    /// Steps per second.
    pub hz: f32,
    /// Maximum simulated time (seconds).
    pub duration: f32,
    pub tuning: WellTuning,
    pub fallback_radius_scale: f32,
    pub ground: bool,
}

/// Result of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub bodies: usize,
    pub consumed: usize,
    pub steps: u64,
    /// Simulated time when the run stopped (seconds).
    pub elapsed: f32,
    pub mean_time_to_consume: Option<f32>,
    pub max_time_to_consume: Option<f32>,
    pub remaining: usize,
    /// Distance from the well center of the closest unconsumed body.
    pub closest_remaining: Option<f32>,
}

impl RunSummary {
    /// Write the summary to stderr, one `#`-prefixed line per value.
    pub fn report(&self) {
        eprintln!();
        eprintln!("# === Run summary ===");
        eprintln!("# Steps: {} ({:.2} s)", self.steps, self.elapsed);
        eprintln!("# Consumed: {} / {}", self.consumed, self.bodies);
        match (self.mean_time_to_consume, self.max_time_to_consume) {
            (Some(mean), Some(max)) => {
                eprintln!("#   Mean time to consume: {mean:.2} s");
                eprintln!("#   Max time to consume: {max:.2} s");
            }
            _ => eprintln!("#   Time to consume: (none consumed)"),
        }
        eprintln!("# Remaining: {}", self.remaining);
        if let Some(closest) = self.closest_remaining {
            eprintln!("#   Closest: {closest:.2}");
        }
    }
}

/// A sandbox world and the well acting on it.
pub struct Simulation {
    world: SandboxWorld,
    driver: WellDriver,
    dt: f32,
    max_steps: u64,
    steps: u64,
    elapsed: f32,
    /// Time of consumption per body, ordered so summaries are reproducible.
    consumed_at: BTreeMap<BodyId, f32>,
}

impl Simulation {
    /// Build the well and world and spawn the scenario.
    pub fn new(config: &SimConfig) -> Result<Self> {
        if !(config.hz.is_finite() && config.hz > 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "step rate must be positive, got {}",
                config.hz
            )));
        }
        if !(config.duration.is_finite() && config.duration >= 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "duration must be non-negative, got {}",
                config.duration
            )));
        }

        if !config.gravity.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "gravity must be finite, got {}",
                config.gravity
            )));
        }

        let spawn = &config.spawn;
        let well = Well::with_tuning(
            spawn.center,
            spawn.outer_radius,
            spawn.inner_radius,
            WellTuning::default(),
        )?
        .with_fallback_radius_scale(config.fallback_radius_scale);
        let mut driver = WellDriver::new(well);
        // Goes through the setter so out-of-range values are reported.
        driver.set_tuning(config.tuning)?;

        let mut world = SandboxWorld::new(Vec3::NEG_Z * config.gravity);
        if !config.ground {
            world = world.without_ground();
        }
        world.set_inner_region(spawn.center, spawn.inner_radius);
        scenario::spawn(&mut world, spawn);
        tracing::info!(
            "Spawned {} bodies ({:?}), well at {} radii {}/{}",
            spawn.count,
            spawn.scenario,
            spawn.center,
            spawn.inner_radius,
            spawn.outer_radius
        );

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_steps = (config.duration * config.hz).ceil() as u64;

        Ok(Self {
            world,
            driver,
            dt: 1.0 / config.hz,
            max_steps,
            steps: 0,
            elapsed: 0.0,
            consumed_at: BTreeMap::new(),
        })
    }

    pub fn world(&self) -> &SandboxWorld {
        &self.world
    }

    /// Whether every body is consumed or the duration has elapsed.
    pub fn is_finished(&self) -> bool {
        self.steps >= self.max_steps || self.world.active_count() == 0
    }

    /// Advance one step: driver, then integration.
    pub fn step(&mut self) -> TelemetrySnapshot {
        let output = self.driver.step(&mut self.world);
        for command in &output.consumptions {
            self.consumed_at.insert(command.body, self.elapsed);
        }

        self.world.integrate(self.dt);
        self.steps += 1;
        self.elapsed += self.dt;

        self.snapshot(&output)
    }

    /// Step until finished, writing telemetry rows to `output`.
    pub fn run(&mut self, output: &mut dyn TelemetryOutput) -> RunSummary {
        reset_telemetry_to(output);
        while !self.is_finished() {
            let snapshot = self.step();
            emit_telemetry_to(&snapshot, output);
        }
        output.flush();
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        let center = self.driver.well().center();
        let times: Vec<f32> = self.consumed_at.values().copied().collect();

        #[allow(clippy::cast_precision_loss)]
        let mean_time_to_consume =
            (!times.is_empty()).then(|| times.iter().sum::<f32>() / times.len() as f32);
        let max_time_to_consume = times.iter().copied().reduce(f32::max);

        let remaining: Vec<f32> = self
            .world
            .bodies()
            .iter()
            .filter(|b| !b.is_consumed())
            .map(|b| b.position.distance(center))
            .collect();

        RunSummary {
            bodies: self.world.bodies().len(),
            consumed: times.len(),
            steps: self.steps,
            elapsed: self.elapsed,
            mean_time_to_consume,
            max_time_to_consume,
            remaining: remaining.len(),
            closest_remaining: remaining.iter().copied().reduce(f32::min),
        }
    }

    fn snapshot(&self, output: &StepOutput) -> TelemetrySnapshot {
        let center = self.driver.well().center();

        let mut min_distance = f32::INFINITY;
        let mut distance_sum = 0.0;
        let mut speed_sum = 0.0;
        let mut tangential_sum = 0.0;
        let mut active = 0_usize;
        for body in self.world.bodies().iter().filter(|b| !b.is_consumed()) {
            let offset = body.position - center;
            let distance = offset.length();
            min_distance = min_distance.min(distance);
            distance_sum += distance;
            speed_sum += body.velocity.length();
            let radial = offset.normalize_or_zero();
            tangential_sum += (body.velocity - radial * body.velocity.dot(radial)).length();
            active += 1;
        }

        let mut radial_sum = 0.0;
        let mut max_accel: f32 = 0.0;
        let mut net_accel = Vec3::ZERO;
        for command in &output.forces {
            let acceleration = command.acceleration();
            radial_sum += command.force.radial_accel;
            max_accel = max_accel.max(acceleration.length());
            net_accel += acceleration;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = |sum: f32, n: usize| if n == 0 { 0.0 } else { sum / n as f32 };

        TelemetrySnapshot {
            elapsed: self.elapsed,
            dt: self.dt,
            active,
            consumed_total: self.consumed_at.len(),
            consumed_step: output.stats.consumed,
            forces: output.stats.forces,
            fallback_used: output.stats.fallback_used,
            min_distance,
            mean_distance: mean(distance_sum, active),
            mean_radial_accel: mean(radial_sum, output.forces.len()),
            max_accel,
            mean_speed: mean(speed_sum, active),
            mean_tangential_speed: mean(tangential_sum, active),
            net_accel,
        }
    }
}
