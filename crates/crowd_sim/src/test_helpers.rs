//! Test helpers for common test setup and utilities.
//!
//! Record shorthands used by unit tests, integration tests and benches.

use bevy_ecs::prelude::World;

use crate::clock::Tick;
use crate::ecs::{TaskId, WorkerId};
use crate::geometry::Point;
use crate::input::{InputRecord, TaskRecord, WorkerRecord};

/// Builder for a worker record released at tick 0 with no deadline.
#[derive(Debug, Clone)]
pub struct WorkerBuilder(WorkerRecord);

impl WorkerBuilder {
    pub fn new(id: u64, lat: f64, lon: f64) -> Self {
        Self(WorkerRecord {
            id: WorkerId(id),
            position: Point::new(lat, lon),
            release_time: 0,
            deadline: None,
            speed: None,
        })
    }

    pub fn released_at(mut self, tick: Tick) -> Self {
        self.0.release_time = tick;
        self
    }

    pub fn deadline(mut self, tick: Tick) -> Self {
        self.0.deadline = Some(tick);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.0.speed = Some(speed);
        self
    }

    pub fn build(self) -> WorkerRecord {
        self.0
    }

    pub fn record(self) -> InputRecord {
        InputRecord::Worker(self.0)
    }
}

/// Builder for a task record with pickup at `(lat, lon)`, dropoff one unit
/// north, released at tick 0 and expiring at tick 100.
#[derive(Debug, Clone)]
pub struct TaskBuilder(TaskRecord);

impl TaskBuilder {
    pub fn new(id: u64, lat: f64, lon: f64) -> Self {
        Self(TaskRecord {
            id: TaskId(id),
            pickup: Point::new(lat, lon),
            dropoff: Point::new(lat + 1.0, lon),
            release_time: 0,
            expiry_time: 100,
        })
    }

    pub fn dropoff(mut self, lat: f64, lon: f64) -> Self {
        self.0.dropoff = Point::new(lat, lon);
        self
    }

    pub fn window(mut self, release_time: Tick, expiry_time: Tick) -> Self {
        self.0.release_time = release_time;
        self.0.expiry_time = expiry_time;
        self
    }

    pub fn build(self) -> TaskRecord {
        self.0
    }

    pub fn record(self) -> InputRecord {
        InputRecord::Task(self.0)
    }
}

pub fn worker(id: u64, lat: f64, lon: f64) -> InputRecord {
    WorkerBuilder::new(id, lat, lon).record()
}

pub fn task(id: u64, lat: f64, lon: f64) -> InputRecord {
    TaskBuilder::new(id, lat, lon).record()
}

/// A world with every resource the per-tick systems read, using defaults.
pub fn create_test_world() -> World {
    let config = crate::config::SimConfig::default();
    let mut world = World::new();
    world.insert_resource(crate::clock::SimulationClock::default());
    world.insert_resource(crate::spatial::SpatialIndex::default());
    world.insert_resource(crate::ecs::ActivePool::default());
    world.insert_resource(crate::input::PendingInput::default());
    world.insert_resource(crate::movement::MovementEvents::default());
    world.insert_resource(crate::metrics::MetricsCollector::new(config.tick_unit_secs));
    world.insert_resource(crate::matching::AssignmentPolicyResource::new(
        crate::matching::build_policy(&config.policy),
    ));
    world.insert_resource(config);
    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::simulation_schedule;

    #[test]
    fn builders_fill_defaults() {
        let record = TaskBuilder::new(4, 2.0, 3.0).window(1, 9).build();
        assert_eq!(record.dropoff, Point::new(3.0, 3.0));
        assert_eq!((record.release_time, record.expiry_time), (1, 9));

        let worker = WorkerBuilder::new(2, 0.0, 0.0).deadline(5).speed(2.0).build();
        assert_eq!(worker.deadline, Some(5));
        assert_eq!(worker.speed, Some(2.0));
    }

    #[test]
    fn test_world_runs_the_full_schedule() {
        let mut world = create_test_world();
        world.resource_mut::<crate::input::PendingInput>().push(worker(1, 0.0, 0.0));
        let mut schedule = simulation_schedule();
        schedule.run(&mut world);
        assert_eq!(world.resource::<crate::ecs::ActivePool>().worker_count(), 1);
        assert_eq!(world.resource::<crate::metrics::MetricsCollector>().records().len(), 1);
    }
}
