//! Movement system: advances every busy worker one step towards its target.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::config::SimConfig;
use crate::ecs::{ActivePool, Position, Task, Worker, WorkerState};
use crate::metrics::MetricsCollector;
use crate::movement::{step_towards, ArrivalKind, MovementEvent, MovementEvents, StepOutcome};

pub fn movement_system(
    config: Res<SimConfig>,
    pool: Res<ActivePool>,
    mut events: ResMut<MovementEvents>,
    mut metrics: ResMut<MetricsCollector>,
    mut workers: Query<(&mut Worker, &mut Position)>,
    tasks: Query<&Task>,
) {
    for id in pool.worker_ids() {
        let Some(entity) = pool.worker(id) else {
            continue;
        };
        let Ok((mut worker, mut position)) = workers.get_mut(entity) else {
            continue;
        };
        let Some(task_id) = worker.assigned_task else {
            continue;
        };
        let Some(task) = pool.task(task_id).and_then(|e| tasks.get(e).ok()) else {
            continue;
        };
        let (target, kind) = match worker.state {
            WorkerState::EnRouteToPickup => (task.pickup, ArrivalKind::ArrivedAtPickup),
            WorkerState::EnRouteToDropoff => (task.dropoff, ArrivalKind::ArrivedAtDropoff),
            WorkerState::Idle => continue,
        };

        let outcome = step_towards(position.0, target, worker.speed, config.distance_metric);
        match outcome {
            StepOutcome::Moved { position: next, .. } => position.0 = next,
            StepOutcome::Arrived { .. } => {
                // Only touch the component when it actually moves.
                if position.0 != target {
                    position.0 = target;
                }
                events.push(MovementEvent {
                    worker: id,
                    task: task_id,
                    kind,
                });
            }
        }
        worker.distance_travelled += outcome.distance();
        metrics.record_travel(outcome.distance());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::ecs::{TaskId, TaskState, WorkerId};
    use crate::geometry::Point;

    fn setup(worker_at: Point, state: WorkerState) -> World {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(MovementEvents::default());
        world.insert_resource(MetricsCollector::default());

        let mut pool = ActivePool::default();
        let task = world
            .spawn(Task {
                id: TaskId(1),
                state: TaskState::Assigned,
                pickup: Point::new(0.0, 3.0),
                dropoff: Point::new(0.0, 4.0),
                release_time: 0,
                expiry_time: 10,
                assigned_worker: Some(WorkerId(1)),
                assigned_at: Some(0),
                picked_up_at: None,
                completed_at: None,
                pickup_distance: Some(3.0),
            })
            .id();
        pool.insert_task(TaskId(1), task);
        let worker = world
            .spawn((
                Worker {
                    id: WorkerId(1),
                    state,
                    release_time: 0,
                    deadline: None,
                    speed: 1.0,
                    assigned_task: Some(TaskId(1)),
                    completed_tasks: 0,
                    idle_ticks: 0,
                    fairness_ewma: 0.0,
                    distance_travelled: 0.0,
                },
                Position(worker_at),
            ))
            .id();
        pool.insert_worker(WorkerId(1), worker);
        world.insert_resource(pool);
        world
    }

    fn position(world: &mut World) -> Point {
        world.query::<&Position>().single(world).0
    }

    #[test]
    fn worker_moves_one_step_per_tick_then_arrives() {
        let mut world = setup(Point::new(0.0, 0.0), WorkerState::EnRouteToPickup);
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);

        schedule.run(&mut world);
        assert_eq!(position(&mut world), Point::new(0.0, 1.0));
        schedule.run(&mut world);
        assert!(world.resource::<MovementEvents>().is_empty());
        schedule.run(&mut world);

        assert_eq!(position(&mut world), Point::new(0.0, 3.0));
        let events = &world.resource::<MovementEvents>().0;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ArrivalKind::ArrivedAtPickup);
        assert_eq!(world.resource::<MetricsCollector>().summary().total_travel_distance, 3.0);
    }

    #[test]
    fn dropoff_leg_targets_the_dropoff() {
        let mut world = setup(Point::new(0.0, 3.0), WorkerState::EnRouteToDropoff);
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        assert_eq!(position(&mut world), Point::new(0.0, 4.0));
        let events = &world.resource::<MovementEvents>().0;
        assert_eq!(events[0].kind, ArrivalKind::ArrivedAtDropoff);
    }
}
