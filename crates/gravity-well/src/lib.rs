//! Gravity-well attraction core.
//!
//! A well pulls physically simulated bodies toward its center and consumes
//! (permanently deactivates) bodies that reach its inner region. The crate
//! holds only the control logic; the host simulation owns bodies, integrates
//! physics, detects overlaps and renders.
//!
//! # Design principles
//!
//! - **Step-driven**: the caller's loop invokes [`WellDriver::step`] (or the
//!   pure [`evaluate_step`]) once per tick
//! - **Mass-independent**: every force is an acceleration
//! - **Skip, don't fail**: bad handles and degenerate geometry are skipped
//!   per body and never abort a step
//!
//! # Example
//!
//! ```ignore
//! use gravity_well::{Well, WellDriver};
//! use glam::Vec3;
//!
//! let well = Well::new(Vec3::ZERO, 1000.0, 1.0)?;
//! let mut driver = WellDriver::new(well);
//!
//! // Once per simulation tick, against anything implementing SimulationHost.
//! let output = driver.step(&mut host);
//! ```

pub mod attraction;
mod body;
pub mod consumption;
mod error;
pub mod host;
mod step;
pub mod tuning;
mod well;

pub use attraction::{AttractionForce, Skip, compute_attraction};
pub use body::{BodyId, BodySnapshot, BodyStatus};
pub use consumption::{ConsumptionCommand, ConsumptionEffect, ConsumptionLedger};
pub use error::{Error, Result};
pub use host::{BoundaryEvent, SimulationHost};
pub use step::{ForceCommand, StepOutput, StepStats, WellDriver, evaluate_step};
pub use tuning::WellTuning;
pub use well::{RADIAL_SPAN_EPSILON, Well};
