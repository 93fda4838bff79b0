//! Error taxonomy for the simulation core.
//!
//! - [`DataError`]: a single input record is malformed. The record is dropped
//!   at admission and counted; the run continues.
//! - [`ConfigError`]: the configuration (or the configuration combined with the
//!   ingested stream) cannot produce a meaningful run. Surfaced before tick 0.
//! - [`InvariantViolation`]: a matching policy broke its contract. Never caused
//!   by user input; the loop treats it as an unrecoverable fault.

use crate::ecs::{TaskId, WorkerId};
use crate::geometry::Point;

/// A malformed input record, rejected at admission time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("{entity} has an invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        entity: String,
        lat: f64,
        lon: f64,
    },

    #[error("task {task} expires at tick {expiry_time}, not after its release at tick {release_time}")]
    ExpiryNotAfterRelease {
        task: TaskId,
        release_time: u64,
        expiry_time: u64,
    },

    #[error("worker {worker} has deadline {deadline} before its release at tick {release_time}")]
    DeadlineBeforeRelease {
        worker: WorkerId,
        release_time: u64,
        deadline: u64,
    },

    #[error("worker {worker} has invalid speed {speed}")]
    InvalidSpeed { worker: WorkerId, speed: f64 },

    #[error("duplicate worker id {0}")]
    DuplicateWorker(WorkerId),

    #[error("duplicate task id {0}")]
    DuplicateTask(TaskId),

    #[error("record received after end of stream")]
    AfterEndOfStream,
}

impl DataError {
    pub(crate) fn invalid_coordinate(entity: impl Into<String>, point: Point) -> Self {
        Self::InvalidCoordinate {
            entity: entity.into(),
            lat: point.lat,
            lon: point.lon,
        }
    }
}

/// Invalid configuration; the run never starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("worker speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),

    #[error("max pickup radius must be non-negative and finite, got {0}")]
    InvalidPickupRadius(f64),

    #[error("tick unit must be positive and finite, got {0} seconds")]
    InvalidTickUnit(f64),

    #[error("grid cell size must be positive and finite, got {0}")]
    InvalidGridCellSize(f64),

    #[error("invalid H3 resolution {0} (expected 0..=15)")]
    InvalidH3Resolution(u8),

    #[error("fairness smoothing factor must lie in [0, 1], got {0}")]
    InvalidFairnessGamma(f64),

    #[error("invalid assignment policy parameters: {reason}")]
    InvalidPolicy { reason: String },

    #[error("horizon of {horizon} ticks ends before the earliest release at tick {earliest_release}")]
    HorizonBeforeRelease { horizon: u64, earliest_release: u64 },

    #[error("run-until-drained requires an end-of-stream marker on the input")]
    UnterminatedInput,
}

/// A broken matching contract detected while applying bindings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("worker {0} bound more than once in a single tick")]
    WorkerBoundTwice(WorkerId),

    #[error("task {0} bound more than once in a single tick")]
    TaskBoundTwice(TaskId),

    #[error("binding references unknown worker {0}")]
    UnknownWorker(WorkerId),

    #[error("binding references unknown task {0}")]
    UnknownTask(TaskId),

    #[error("worker {0} is not idle")]
    WorkerNotIdle(WorkerId),

    #[error("task {0} is not pending")]
    TaskNotPending(TaskId),

    #[error("task {task} bound at tick {tick} outside its window [{release_time}, {expiry_time})")]
    OutsideValidityWindow {
        task: TaskId,
        tick: u64,
        release_time: u64,
        expiry_time: u64,
    },
}
