//! Consumption state machine.
//!
//! A body that enters the inner region while `Active` is consumed: hidden,
//! made non-collidable, removed from physics and from per-step updates, and
//! tagged. The body is deactivated rather than destroyed so host handles stay
//! valid. Consumption happens at most once per body.

use std::collections::HashSet;

use crate::body::{BodyId, BodySnapshot};

/// Tag the host stores on consumed bodies.
pub const CONSUMED_TAG: &str = "consumed";

/// Side effect requested from the host when a body is consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsumptionEffect {
    /// Compare-and-set on the host's consumed marker; the remaining effects
    /// are issued only if it succeeds.
    TagConsumed,
    Hide,
    DisableCollision,
    DisablePhysics,
    DisableTick,
}

impl ConsumptionEffect {
    /// All effects, in the order they are issued.
    pub const ALL: [ConsumptionEffect; 5] = [
        ConsumptionEffect::TagConsumed,
        ConsumptionEffect::Hide,
        ConsumptionEffect::DisableCollision,
        ConsumptionEffect::DisablePhysics,
        ConsumptionEffect::DisableTick,
    ];
}

/// Request to consume one body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsumptionCommand {
    pub body: BodyId,
}

impl ConsumptionCommand {
    /// Effects to issue for this command, in order.
    #[must_use]
    pub fn effects(&self) -> [ConsumptionEffect; 5] {
        ConsumptionEffect::ALL
    }
}

/// Per-step guard against consuming the same body twice.
///
/// A body can be reported by more than one overlap source in a step; only
/// the first report for an `Active` body yields a command.
#[derive(Debug, Default)]
pub struct ConsumptionLedger {
    consumed: HashSet<BodyId>,
}

impl ConsumptionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inner-region entry.
    ///
    /// Returns a command if this entry consumes the body.
    pub fn enter(&mut self, body: &BodySnapshot) -> Option<ConsumptionCommand> {
        if body.status.is_consumed() {
            tracing::trace!("{} already consumed, ignoring entry", body.id);
            return None;
        }
        if !self.consumed.insert(body.id) {
            tracing::trace!("{} already consumed this step", body.id);
            return None;
        }
        Some(ConsumptionCommand { body: body.id })
    }

    /// Whether `id` was consumed through this ledger.
    #[must_use]
    pub fn contains(&self, id: BodyId) -> bool {
        self.consumed.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}
