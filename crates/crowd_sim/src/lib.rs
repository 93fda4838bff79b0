//! Discrete-tick simulation of spatial crowdsourcing: workers are matched to
//! short-lived spatial tasks, travel to the pickup, carry the task to its
//! dropoff and become available again.
//!
//! The [`runner::Simulation`] owns a `bevy_ecs` world; [`matching`] holds the
//! pluggable assignment policies.

pub mod clock;
pub mod config;
pub mod ecs;
pub mod error;
pub mod geometry;
pub mod input;
pub mod matching;
pub mod metrics;
pub mod movement;
pub mod runner;
pub mod spatial;
pub mod synthetic;
pub mod systems;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use config::{Horizon, PolicyKind, SimConfig};
pub use error::{ConfigError, DataError, InvariantViolation};
pub use runner::Simulation;
