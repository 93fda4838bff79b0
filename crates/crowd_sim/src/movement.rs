//! Movement model: straight-line travel at constant speed.
//!
//! Each tick a busy worker moves `speed` distance units towards its current
//! target (pickup or dropoff). When the remaining distance fits in one step the
//! worker snaps exactly onto the target and an arrival event fires for that
//! tick. Arrivals are consumed by the completion system, which performs the
//! worker/task state transitions.

use bevy_ecs::prelude::Resource;

use crate::ecs::{TaskId, WorkerId};
use crate::geometry::{DistanceMetric, Point, DISTANCE_EPSILON};

/// Result of moving one step towards a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Still travelling; `distance` was covered this tick.
    Moved { position: Point, distance: f64 },
    /// Reached the target this tick after covering `distance`.
    Arrived { distance: f64 },
}

impl StepOutcome {
    pub fn distance(&self) -> f64 {
        match *self {
            StepOutcome::Moved { distance, .. } | StepOutcome::Arrived { distance } => distance,
        }
    }
}

/// Advances `from` towards `to` by at most `speed` under `metric`.
///
/// Interpolation is linear in coordinate space; for the geographic metrics the
/// fraction is derived from the metric distance, which is accurate at city
/// scale.
pub fn step_towards(from: Point, to: Point, speed: f64, metric: DistanceMetric) -> StepOutcome {
    let remaining = metric.distance(from, to);
    if remaining <= speed + DISTANCE_EPSILON || !remaining.is_finite() {
        return StepOutcome::Arrived {
            distance: if remaining.is_finite() { remaining } else { 0.0 },
        };
    }
    StepOutcome::Moved {
        position: from.lerp(to, speed / remaining),
        distance: speed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalKind {
    ArrivedAtPickup,
    ArrivedAtDropoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementEvent {
    pub worker: WorkerId,
    pub task: TaskId,
    pub kind: ArrivalKind,
}

/// Arrival events produced by the movement system this tick.
#[derive(Debug, Default, Resource)]
pub struct MovementEvents(pub Vec<MovementEvent>);

impl MovementEvents {
    pub fn push(&mut self, event: MovementEvent) {
        self.0.push(event);
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, MovementEvent> {
        self.0.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_speed_units_along_the_line() {
        let outcome = step_towards(
            Point::new(0.0, 0.0),
            Point::new(0.0, 4.0),
            1.5,
            DistanceMetric::Euclidean,
        );
        match outcome {
            StepOutcome::Moved { position, distance } => {
                assert!((position.lon - 1.5).abs() < 1e-12);
                assert_eq!(position.lat, 0.0);
                assert_eq!(distance, 1.5);
            }
            other => panic!("expected Moved, got {other:?}"),
        }
    }

    #[test]
    fn snaps_when_remaining_distance_fits_in_one_step() {
        let outcome = step_towards(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            1.0,
            DistanceMetric::Euclidean,
        );
        assert_eq!(outcome, StepOutcome::Arrived { distance: 1.0 });

        let outcome = step_towards(
            Point::new(2.0, 2.0),
            Point::new(2.0, 2.0),
            1.0,
            DistanceMetric::Euclidean,
        );
        assert_eq!(outcome, StepOutcome::Arrived { distance: 0.0 });
    }

    #[test]
    fn geographic_step_covers_speed_in_kilometres() {
        let from = Point::new(52.5, 13.4);
        let to = Point::new(52.6, 13.4);
        let StepOutcome::Moved { position, distance } =
            step_towards(from, to, 2.0, DistanceMetric::Haversine)
        else {
            panic!("expected Moved");
        };
        assert_eq!(distance, 2.0);
        let covered = DistanceMetric::Haversine.distance(from, position);
        assert!((covered - 2.0).abs() < 0.01, "covered {covered}");
    }
}
