//! Per-step evaluation and the host-facing driver.
//!
//! [`evaluate_step`] is the pure step function: snapshots in, commands out.
//! [`WellDriver`] wraps it for a [`SimulationHost`]: it gathers candidates,
//! drains inner-region events, evaluates, and issues the commands.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::attraction::{AttractionForce, Skip, compute_attraction};
use crate::body::{BodyId, BodySnapshot};
use crate::consumption::{ConsumptionCommand, ConsumptionEffect, ConsumptionLedger};
use crate::error::Result;
use crate::host::{BoundaryEvent, SimulationHost};
use crate::tuning::WellTuning;
use crate::well::Well;

/// Acceleration to apply to one body this step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceCommand {
    pub body: BodyId,
    pub force: AttractionForce,
}

impl ForceCommand {
    /// Total acceleration to apply.
    #[must_use]
    pub fn acceleration(&self) -> Vec3 {
        self.force.total()
    }
}

/// Counters for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Unique candidate bodies evaluated.
    pub candidates: usize,
    pub forces: usize,
    pub consumed: usize,
    pub skipped_not_simulated: usize,
    pub skipped_consumed: usize,
    pub skipped_invalid: usize,
    pub skipped_degenerate: usize,
    /// Handles the host could not resolve.
    pub invalid_handles: usize,
    /// Whether the primary query came back empty and the fallback was used.
    pub fallback_used: bool,
}

impl StepStats {
    fn record_skip(&mut self, skip: Skip) {
        match skip {
            Skip::NotSimulated => self.skipped_not_simulated += 1,
            Skip::Consumed => self.skipped_consumed += 1,
            Skip::InvalidState => self.skipped_invalid += 1,
            Skip::Degenerate => self.skipped_degenerate += 1,
        }
    }
}

/// Commands produced by one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepOutput {
    pub forces: Vec<ForceCommand>,
    pub consumptions: Vec<ConsumptionCommand>,
    pub stats: StepStats,
}

/// Evaluate one step.
///
/// `candidates` are the bodies eligible for attraction; repeated ids are
/// evaluated once. `entered` are the bodies that entered the inner region
/// since the last step. Bodies consumed here receive no force in the same
/// step.
#[must_use]
pub fn evaluate_step(
    well: &Well,
    candidates: &[BodySnapshot],
    entered: &[BodySnapshot],
    gravity: Vec3,
) -> StepOutput {
    let mut stats = StepStats::default();

    // Consumption is serialized so each body transitions at most once.
    let mut ledger = ConsumptionLedger::new();
    let consumptions: Vec<ConsumptionCommand> =
        entered.iter().filter_map(|body| ledger.enter(body)).collect();
    stats.consumed = consumptions.len();

    let mut seen = HashSet::with_capacity(candidates.len());
    let unique: Vec<&BodySnapshot> = candidates
        .iter()
        .filter(|body| seen.insert(body.id))
        .collect();
    stats.candidates = unique.len();

    let evaluate = |body: &&BodySnapshot| {
        if ledger.contains(body.id) {
            return (body.id, Err(Skip::Consumed));
        }
        (body.id, compute_attraction(well, body, gravity))
    };

    #[cfg(feature = "parallel")]
    let results: Vec<_> = unique.par_iter().map(evaluate).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = unique.iter().map(evaluate).collect();

    let mut forces = Vec::with_capacity(results.len());
    for (body, result) in results {
        match result {
            Ok(force) => {
                tracing::debug!(
                    "{body}: distance {:.2}, t {:.3}, kp {:.1}, radial {:.1}, total {:.1}",
                    force.distance,
                    force.t,
                    force.kp,
                    force.radial_accel,
                    force.total().length()
                );
                forces.push(ForceCommand { body, force });
            }
            Err(skip) => {
                tracing::trace!("{body}: skipped ({skip:?})");
                stats.record_skip(skip);
            }
        }
    }
    stats.forces = forces.len();

    StepOutput {
        forces,
        consumptions,
        stats,
    }
}

/// Drives one well against a host, once per simulation step.
#[derive(Debug)]
pub struct WellDriver {
    well: Well,
}

impl WellDriver {
    #[must_use]
    pub fn new(well: Well) -> Self {
        Self { well }
    }

    pub fn well(&self) -> &Well {
        &self.well
    }

    /// Replace the tuning; takes effect on the next step.
    pub fn set_tuning(&mut self, tuning: WellTuning) -> Result<()> {
        self.well.set_tuning(tuning)
    }

    /// Move the well; takes effect on the next step.
    pub fn set_center(&mut self, center: Vec3) -> Result<()> {
        self.well.set_center(center)
    }

    /// Run one step against `host` and return what was issued.
    pub fn step<H: SimulationHost>(&mut self, host: &mut H) -> StepOutput {
        let well = &self.well;
        let center = well.center();

        let mut ids = host.bodies_within(center, well.outer_radius());
        let fallback_used = ids.is_empty();
        if fallback_used {
            ids = host.bodies_within(center, well.fallback_radius());
            if !ids.is_empty() {
                tracing::debug!(
                    "Primary query empty, fallback radius {:.1} found {} bodies",
                    well.fallback_radius(),
                    ids.len()
                );
            }
        }

        let mut seen = HashSet::with_capacity(ids.len());
        ids.retain(|id| seen.insert(*id));

        let mut invalid_handles = 0;
        let candidates: Vec<BodySnapshot> = ids
            .into_iter()
            .filter_map(|id| {
                let snapshot = host.snapshot(id);
                if snapshot.is_none() {
                    tracing::debug!("{id}: invalid handle in candidate list");
                    invalid_handles += 1;
                }
                snapshot
            })
            .collect();

        let by_id: HashMap<BodyId, &BodySnapshot> =
            candidates.iter().map(|body| (body.id, body)).collect();
        let mut entered = Vec::new();
        for event in host.drain_boundary_events() {
            match event {
                BoundaryEvent::Entered(id) => {
                    let snapshot = by_id
                        .get(&id)
                        .map(|body| **body)
                        .or_else(|| host.snapshot(id));
                    match snapshot {
                        Some(body) => entered.push(body),
                        None => {
                            tracing::debug!("{id}: invalid handle in boundary event");
                            invalid_handles += 1;
                        }
                    }
                }
                BoundaryEvent::Exited(id) => tracing::trace!("{id}: left inner region"),
            }
        }

        let mut output = evaluate_step(well, &candidates, &entered, host.gravity());
        output.stats.fallback_used = fallback_used;
        output.stats.invalid_handles = invalid_handles;

        apply_consumptions(host, &mut output);
        for command in &output.forces {
            host.wake(command.body);
            host.apply_acceleration(command.body, command.acceleration());
        }

        output
    }
}

/// Issue consumption effects, dropping commands the host rejects as repeats.
fn apply_consumptions<H: SimulationHost>(host: &mut H, output: &mut StepOutput) {
    output.consumptions.retain(|command| {
        let body = command.body;
        for effect in command.effects() {
            match effect {
                ConsumptionEffect::TagConsumed => {
                    if !host.mark_consumed(body) {
                        tracing::trace!("{body}: host reports already consumed");
                        return false;
                    }
                }
                ConsumptionEffect::Hide => host.set_visible(body, false),
                ConsumptionEffect::DisableCollision => host.set_collision_enabled(body, false),
                ConsumptionEffect::DisablePhysics => host.set_simulate_physics(body, false),
                ConsumptionEffect::DisableTick => host.set_tick_enabled(body, false),
            }
        }
        tracing::info!("{body} consumed");
        true
    });
    output.stats.consumed = output.consumptions.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyStatus;

    const GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -980.0);

    fn test_well() -> Well {
        Well::new(Vec3::ZERO, 1000.0, 1.0).unwrap()
    }

    #[test]
    fn test_evaluate_mixed_candidates() {
        let well = test_well();
        let candidates = [
            BodySnapshot::new(BodyId(1), Vec3::new(500.0, 0.0, 0.0)),
            BodySnapshot::new(BodyId(2), Vec3::new(0.0001, 0.0, 0.0)),
            BodySnapshot::new(BodyId(3), Vec3::new(0.0, 300.0, 0.0)).with_simulated(false),
            BodySnapshot::new(BodyId(4), Vec3::new(0.0, 0.0, 50.0))
                .with_status(BodyStatus::Consumed),
        ];

        let output = evaluate_step(&well, &candidates, &[], GRAVITY);
        assert_eq!(output.forces.len(), 1);
        assert_eq!(output.forces[0].body, BodyId(1));
        assert!(output.consumptions.is_empty());
        assert_eq!(output.stats.candidates, 4);
        assert_eq!(output.stats.skipped_degenerate, 1);
        assert_eq!(output.stats.skipped_not_simulated, 1);
        assert_eq!(output.stats.skipped_consumed, 1);
    }

    #[test]
    fn test_evaluate_deduplicates_candidates() {
        let well = test_well();
        let body = BodySnapshot::new(BodyId(1), Vec3::new(200.0, 0.0, 0.0));
        let output = evaluate_step(&well, &[body, body, body], &[], GRAVITY);
        assert_eq!(output.forces.len(), 1);
        assert_eq!(output.stats.candidates, 1);
    }

    #[test]
    fn test_entered_body_consumed_without_force() {
        let well = test_well();
        let body = BodySnapshot::new(BodyId(9), Vec3::new(0.5, 0.0, 0.0));
        let output = evaluate_step(&well, &[body], &[body, body], GRAVITY);
        assert_eq!(output.consumptions, vec![ConsumptionCommand { body: BodyId(9) }]);
        assert!(output.forces.is_empty());
        assert_eq!(output.stats.consumed, 1);
        assert_eq!(output.stats.skipped_consumed, 1);
    }

    #[test]
    fn test_force_order_follows_candidates() {
        let well = test_well();
        let candidates: Vec<BodySnapshot> = (0..16)
            .map(|i| BodySnapshot::new(BodyId(i), Vec3::new(10.0 + i as f32 * 20.0, 5.0, 0.0)))
            .collect();
        let output = evaluate_step(&well, &candidates, &[], GRAVITY);
        let order: Vec<u64> = output.forces.iter().map(|f| f.body.0).collect();
        assert_eq!(order, (0..16).collect::<Vec<_>>());
    }

    /// Host call recorded by [`MockHost`].
    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Wake(BodyId),
        Accelerate(BodyId, Vec3),
        Visible(BodyId, bool),
        Collision(BodyId, bool),
        Physics(BodyId, bool),
        Tick(BodyId, bool),
        MarkConsumed(BodyId, bool),
    }

    #[derive(Default)]
    struct MockHost {
        bodies: Vec<BodySnapshot>,
        /// Ids returned in addition to the real query result.
        extra_ids: Vec<BodyId>,
        events: Vec<BoundaryEvent>,
        calls: Vec<Call>,
    }

    impl MockHost {
        fn with_bodies(bodies: Vec<BodySnapshot>) -> Self {
            Self {
                bodies,
                ..Self::default()
            }
        }

        fn status(&self, id: BodyId) -> BodyStatus {
            self.bodies
                .iter()
                .find(|b| b.id == id)
                .map(|b| b.status)
                .unwrap_or_default()
        }
    }

    impl SimulationHost for MockHost {
        fn bodies_within(&self, center: Vec3, radius: f32) -> Vec<BodyId> {
            let mut ids: Vec<BodyId> = self
                .bodies
                .iter()
                .filter(|b| b.simulated && b.position.distance(center) <= radius)
                .map(|b| b.id)
                .collect();
            if !ids.is_empty() {
                ids.extend(self.extra_ids.iter().copied());
            }
            ids
        }

        fn snapshot(&self, id: BodyId) -> Option<BodySnapshot> {
            self.bodies.iter().find(|b| b.id == id).copied()
        }

        fn gravity(&self) -> Vec3 {
            GRAVITY
        }

        fn wake(&mut self, id: BodyId) {
            self.calls.push(Call::Wake(id));
        }

        fn apply_acceleration(&mut self, id: BodyId, acceleration: Vec3) {
            self.calls.push(Call::Accelerate(id, acceleration));
        }

        fn drain_boundary_events(&mut self) -> Vec<BoundaryEvent> {
            std::mem::take(&mut self.events)
        }

        fn set_visible(&mut self, id: BodyId, visible: bool) {
            self.calls.push(Call::Visible(id, visible));
        }

        fn set_collision_enabled(&mut self, id: BodyId, enabled: bool) {
            self.calls.push(Call::Collision(id, enabled));
        }

        fn set_simulate_physics(&mut self, id: BodyId, simulate: bool) {
            self.calls.push(Call::Physics(id, simulate));
        }

        fn set_tick_enabled(&mut self, id: BodyId, enabled: bool) {
            self.calls.push(Call::Tick(id, enabled));
        }

        fn mark_consumed(&mut self, id: BodyId) -> bool {
            let transitioned = self
                .bodies
                .iter_mut()
                .find(|b| b.id == id)
                .is_some_and(|b| b.status.consume());
            self.calls.push(Call::MarkConsumed(id, transitioned));
            transitioned
        }
    }

    #[test]
    fn test_driver_wakes_before_accelerating() {
        let mut host = MockHost::with_bodies(vec![BodySnapshot::new(
            BodyId(1),
            Vec3::new(0.0, 400.0, 0.0),
        )]);
        let mut driver = WellDriver::new(test_well());

        let output = driver.step(&mut host);
        assert_eq!(output.forces.len(), 1);
        assert!(!output.stats.fallback_used);
        assert_eq!(host.calls.len(), 2);
        assert_eq!(host.calls[0], Call::Wake(BodyId(1)));
        let Call::Accelerate(id, accel) = &host.calls[1] else {
            panic!("expected acceleration, got {:?}", host.calls[1]);
        };
        assert_eq!(*id, BodyId(1));
        assert!((*accel - output.forces[0].acceleration()).length() < 1e-4);
        assert!(accel.y < 0.0);
    }

    #[test]
    fn test_driver_consumes_once() {
        let mut host = MockHost::with_bodies(vec![
            BodySnapshot::new(BodyId(1), Vec3::new(0.5, 0.0, 0.0)),
            BodySnapshot::new(BodyId(2), Vec3::new(300.0, 0.0, 0.0)),
        ]);
        host.events = vec![
            BoundaryEvent::Entered(BodyId(1)),
            BoundaryEvent::Entered(BodyId(1)),
        ];
        let mut driver = WellDriver::new(test_well());

        let output = driver.step(&mut host);
        assert_eq!(output.consumptions.len(), 1);
        assert_eq!(output.forces.len(), 1);
        assert_eq!(output.forces[0].body, BodyId(2));
        assert_eq!(
            &host.calls[..5],
            &[
                Call::MarkConsumed(BodyId(1), true),
                Call::Visible(BodyId(1), false),
                Call::Collision(BodyId(1), false),
                Call::Physics(BodyId(1), false),
                Call::Tick(BodyId(1), false),
            ]
        );
        assert!(host.status(BodyId(1)).is_consumed());

        // The same body overlapping again later changes nothing.
        host.calls.clear();
        host.events = vec![BoundaryEvent::Entered(BodyId(1))];
        let output = driver.step(&mut host);
        assert!(output.consumptions.is_empty());
        assert!(
            host.calls
                .iter()
                .all(|call| matches!(call, Call::Wake(BodyId(2)) | Call::Accelerate(BodyId(2), _)))
        );
    }

    #[test]
    fn test_driver_respects_host_guard() {
        // Host already tagged the body, but the snapshot is stale.
        struct StaleHost(MockHost);

        let mut inner = MockHost::with_bodies(vec![BodySnapshot::new(
            BodyId(5),
            Vec3::new(0.5, 0.0, 0.0),
        )]);
        inner.bodies[0].status.consume();
        inner.events = vec![BoundaryEvent::Entered(BodyId(5))];
        let mut host = StaleHost(inner);

        impl SimulationHost for StaleHost {
            fn bodies_within(&self, center: Vec3, radius: f32) -> Vec<BodyId> {
                self.0.bodies_within(center, radius)
            }
            fn snapshot(&self, id: BodyId) -> Option<BodySnapshot> {
                self.0
                    .snapshot(id)
                    .map(|body| body.with_status(BodyStatus::Active))
            }
            fn gravity(&self) -> Vec3 {
                self.0.gravity()
            }
            fn wake(&mut self, id: BodyId) {
                self.0.wake(id);
            }
            fn apply_acceleration(&mut self, id: BodyId, acceleration: Vec3) {
                self.0.apply_acceleration(id, acceleration);
            }
            fn drain_boundary_events(&mut self) -> Vec<BoundaryEvent> {
                self.0.drain_boundary_events()
            }
            fn set_visible(&mut self, id: BodyId, visible: bool) {
                self.0.set_visible(id, visible);
            }
            fn set_collision_enabled(&mut self, id: BodyId, enabled: bool) {
                self.0.set_collision_enabled(id, enabled);
            }
            fn set_simulate_physics(&mut self, id: BodyId, simulate: bool) {
                self.0.set_simulate_physics(id, simulate);
            }
            fn set_tick_enabled(&mut self, id: BodyId, enabled: bool) {
                self.0.set_tick_enabled(id, enabled);
            }
            fn mark_consumed(&mut self, id: BodyId) -> bool {
                self.0.mark_consumed(id)
            }
        }

        let mut driver = WellDriver::new(test_well());
        let output = driver.step(&mut host);
        assert!(output.consumptions.is_empty());
        assert_eq!(output.stats.consumed, 0);
        assert_eq!(host.0.calls, vec![Call::MarkConsumed(BodyId(5), false)]);
    }

    #[test]
    fn test_driver_fallback_query() {
        // Body beyond the outer radius: the primary query finds nothing.
        let mut host = MockHost::with_bodies(vec![BodySnapshot::new(
            BodyId(7),
            Vec3::new(1500.0, 0.0, 0.0),
        )]);
        let mut driver = WellDriver::new(test_well());

        let output = driver.step(&mut host);
        assert!(output.stats.fallback_used);
        assert_eq!(output.forces.len(), 1);
        let force = output.forces[0].force;
        assert!((force.t - 1.0).abs() < f32::EPSILON);
        assert!((force.kp - 5000.0).abs() < 1e-3);
        assert!(output.forces[0].acceleration().x < 0.0);
    }

    #[test]
    fn test_driver_nothing_in_range() {
        let mut host = MockHost::with_bodies(vec![BodySnapshot::new(
            BodyId(8),
            Vec3::new(10_000.0, 0.0, 0.0),
        )]);
        let mut driver = WellDriver::new(test_well());

        let output = driver.step(&mut host);
        assert!(output.stats.fallback_used);
        assert!(output.forces.is_empty());
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_driver_skips_invalid_handles_and_duplicates() {
        let mut host = MockHost::with_bodies(vec![BodySnapshot::new(
            BodyId(1),
            Vec3::new(100.0, 0.0, 0.0),
        )]);
        host.extra_ids = vec![BodyId(1), BodyId(99)];
        host.events = vec![BoundaryEvent::Entered(BodyId(98)), BoundaryEvent::Exited(BodyId(1))];
        let mut driver = WellDriver::new(test_well());

        let output = driver.step(&mut host);
        assert_eq!(output.forces.len(), 1);
        assert_eq!(output.stats.candidates, 1);
        assert_eq!(output.stats.invalid_handles, 2);
        assert!(output.consumptions.is_empty());
    }

    #[test]
    fn test_driver_tuning_applies_next_step() {
        let mut host = MockHost::with_bodies(vec![BodySnapshot::new(
            BodyId(1),
            Vec3::new(0.0, 500.5, 0.0),
        )
        .with_gravity(false)]);
        let mut driver = WellDriver::new(test_well());

        let before = driver.step(&mut host).forces[0].force.radial_accel;
        driver
            .set_tuning(WellTuning {
                kp_outer: 9000.0,
                ..WellTuning::default()
            })
            .unwrap();
        let after = driver.step(&mut host).forces[0].force.radial_accel;
        assert!((before - 3100.0).abs() < 0.1);
        assert!((after - 5100.0).abs() < 0.1);
    }
}
