//! Eviction: pending tasks past expiry and idle workers past their deadline
//! leave the pool.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::debug;

use crate::clock::SimulationClock;
use crate::ecs::{ActivePool, Task, TaskState, Worker};
use crate::metrics::MetricsCollector;

pub fn eviction_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    mut pool: ResMut<ActivePool>,
    mut metrics: ResMut<MetricsCollector>,
    mut tasks: Query<&mut Task>,
    workers: Query<&Worker>,
) {
    let now = clock.now();

    let task_ids: Vec<_> = pool.task_ids().collect();
    for id in task_ids {
        let Some(entity) = pool.task(id) else {
            continue;
        };
        let Ok(mut task) = tasks.get_mut(entity) else {
            continue;
        };
        if task.state != TaskState::Pending || task.expiry_time > now {
            continue;
        }
        task.state = TaskState::Expired;
        debug!(tick = now, task = %id, expiry_time = task.expiry_time, "task expired");
        metrics.record_expired();
        pool.remove_task(id);
        commands.entity(entity).despawn();
    }

    let worker_ids: Vec<_> = pool.worker_ids().collect();
    for id in worker_ids {
        let Some(entity) = pool.worker(id) else {
            continue;
        };
        let Ok(worker) = workers.get(entity) else {
            continue;
        };
        let past_deadline = worker.deadline.is_some_and(|deadline| deadline < now);
        if !worker.is_idle() || !past_deadline {
            continue;
        }
        debug!(tick = now, worker = %id, "worker left after deadline");
        metrics.record_worker_evicted();
        pool.remove_worker(id);
        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};
    use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

    use crate::ecs::{Position, TaskId, WorkerId, WorkerState};
    use crate::geometry::Point;

    fn task(id: u64, state: TaskState, expiry_time: u64) -> Task {
        Task {
            id: TaskId(id),
            state,
            pickup: Point::new(0.0, 0.0),
            dropoff: Point::new(1.0, 0.0),
            release_time: 0,
            expiry_time,
            assigned_worker: None,
            assigned_at: None,
            picked_up_at: None,
            completed_at: None,
            pickup_distance: None,
        }
    }

    fn worker(id: u64, state: WorkerState, deadline: Option<u64>) -> (Worker, Position) {
        (
            Worker {
                id: WorkerId(id),
                state,
                release_time: 0,
                deadline,
                speed: 1.0,
                assigned_task: None,
                completed_tasks: 0,
                idle_ticks: 0,
                fairness_ewma: 0.0,
                distance_travelled: 0.0,
            },
            Position(Point::new(0.0, 0.0)),
        )
    }

    #[test]
    fn expires_pending_tasks_and_evicts_idle_workers_past_deadline() {
        let mut world = World::new();
        let mut clock = SimulationClock::default();
        clock.advance();
        clock.advance();
        world.insert_resource(clock);
        world.insert_resource(MetricsCollector::default());

        let mut pool = ActivePool::default();
        for (id, state, expiry) in [
            (1, TaskState::Pending, 2),
            (2, TaskState::Pending, 3),
            (3, TaskState::Assigned, 1),
        ] {
            let entity = world.spawn(task(id, state, expiry)).id();
            pool.insert_task(TaskId(id), entity);
        }
        for (id, state, deadline) in [
            (1, WorkerState::Idle, Some(1)),
            (2, WorkerState::Idle, Some(2)),
            (3, WorkerState::EnRouteToDropoff, Some(0)),
            (4, WorkerState::Idle, None),
        ] {
            let entity = world.spawn(worker(id, state, deadline)).id();
            pool.insert_worker(WorkerId(id), entity);
        }
        world.insert_resource(pool);

        let mut schedule = Schedule::default();
        schedule.add_systems((eviction_system, apply_deferred).chain());
        schedule.run(&mut world);

        let pool = world.resource::<ActivePool>();
        assert_eq!(pool.task_ids().collect::<Vec<_>>(), vec![TaskId(2), TaskId(3)]);
        assert_eq!(
            pool.worker_ids().collect::<Vec<_>>(),
            vec![WorkerId(2), WorkerId(3), WorkerId(4)]
        );

        let summary = world.resource::<MetricsCollector>().summary();
        assert_eq!(summary.tasks_expired, 1);
        assert_eq!(summary.workers_evicted, 1);
        assert_eq!(world.query::<&Task>().iter(&world).count(), 2);
    }
}
