//! Completion system: applies pickup and dropoff arrivals.
//!
//! ArrivedAtPickup moves the worker onto the dropoff leg and marks the task
//! picked up. ArrivedAtDropoff completes the task, frees the worker and
//! removes the task from the pool; only its metrics record survives.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::info;

use crate::clock::SimulationClock;
use crate::config::SimConfig;
use crate::ecs::{ActivePool, Task, TaskState, Worker, WorkerState};
use crate::metrics::{CompletedTaskRecord, MetricsCollector};
use crate::movement::{ArrivalKind, MovementEvents};

#[allow(clippy::too_many_arguments)]
pub fn completion_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    mut events: ResMut<MovementEvents>,
    mut pool: ResMut<ActivePool>,
    mut metrics: ResMut<MetricsCollector>,
    mut workers: Query<&mut Worker>,
    mut tasks: Query<&mut Task>,
) {
    let now = clock.now();

    for event in events.drain() {
        let (Some(worker_entity), Some(task_entity)) = (pool.worker(event.worker), pool.task(event.task)) else {
            continue;
        };
        let (Ok(mut worker), Ok(mut task)) = (workers.get_mut(worker_entity), tasks.get_mut(task_entity)) else {
            continue;
        };

        match event.kind {
            ArrivalKind::ArrivedAtPickup => {
                worker.state = WorkerState::EnRouteToDropoff;
                task.state = TaskState::PickedUp;
                task.picked_up_at = Some(now);
                metrics.record_pickup();
            }
            ArrivalKind::ArrivedAtDropoff => {
                task.state = TaskState::Completed;
                task.completed_at = Some(now);
                worker.state = WorkerState::Idle;
                worker.assigned_task = None;
                worker.completed_tasks += 1;

                let assigned_at = task.assigned_at.unwrap_or(now);
                let record = CompletedTaskRecord {
                    task: task.id,
                    worker: worker.id,
                    release_time: task.release_time,
                    expiry_time: task.expiry_time,
                    assigned_at,
                    picked_up_at: task.picked_up_at.unwrap_or(assigned_at),
                    completed_at: now,
                    pickup_distance: task.pickup_distance.unwrap_or(0.0),
                    trip_distance: config.distance_metric.distance(task.pickup, task.dropoff),
                };
                info!(
                    tick = now,
                    worker = %worker.id,
                    task = %task.id,
                    service_ticks = record.service_ticks(),
                    "task completed"
                );
                metrics.record_completion(record);
                pool.remove_task(event.task);
                commands.entity(task_entity).despawn();
            }
        }
    }
}
