//! Matching system: offers idle workers and assignable tasks to the configured
//! policy and applies the returned bindings.
//!
//! Bindings are checked against the matching contract before any state is
//! touched. A violation means the policy is broken, not the input, and aborts
//! the run.

use std::collections::HashSet;

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::info;

use crate::clock::{SimulationClock, Tick};
use crate::config::SimConfig;
use crate::ecs::{ActivePool, Position, Task, TaskState, Worker, WorkerState};
use crate::error::InvariantViolation;
use crate::matching::{AssignmentPolicyResource, Binding, Feasibility, TaskCandidate, WorkerCandidate};
use crate::metrics::MetricsCollector;
use crate::spatial::SpatialIndex;

#[allow(clippy::too_many_arguments)]
pub fn matching_system(
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    spatial_index: Res<SpatialIndex>,
    policy: Res<AssignmentPolicyResource>,
    pool: Res<ActivePool>,
    mut metrics: ResMut<MetricsCollector>,
    mut workers: Query<(&mut Worker, &Position)>,
    mut tasks: Query<&mut Task>,
) {
    let now = clock.now();

    let idle: Vec<WorkerCandidate> = pool
        .worker_ids()
        .filter_map(|id| pool.worker(id))
        .filter_map(|entity| workers.get(entity).ok())
        .filter(|(worker, _)| worker.is_idle())
        .map(|(worker, position)| WorkerCandidate {
            id: worker.id,
            position: position.0,
            speed: worker.speed,
            deadline: worker.deadline,
            idle_ticks: worker.idle_ticks,
            fairness_ewma: worker.fairness_ewma,
        })
        .collect();
    let pending: Vec<TaskCandidate> = pool
        .task_ids()
        .filter_map(|id| pool.task(id))
        .filter_map(|entity| tasks.get(entity).ok())
        .filter(|task| task.is_assignable_at(now))
        .map(|task| TaskCandidate {
            id: task.id,
            pickup: task.pickup,
            dropoff: task.dropoff,
            release_time: task.release_time,
            expiry_time: task.expiry_time,
        })
        .collect();
    if idle.is_empty() || pending.is_empty() {
        return;
    }

    let feasibility = Feasibility::new(now, config.max_pickup_radius, &spatial_index);
    let bindings = policy.assign(&idle, &pending, &feasibility);

    if let Err(violation) = check_bindings(&bindings, now, &pool, &workers, &tasks) {
        panic!(
            "assignment policy `{}` broke the matching contract at tick {now}: {violation}",
            policy.name()
        );
    }

    for binding in bindings {
        let (Some(worker_entity), Some(task_entity)) = (pool.worker(binding.worker), pool.task(binding.task)) else {
            continue;
        };
        let (Ok((mut worker, _)), Ok(mut task)) = (workers.get_mut(worker_entity), tasks.get_mut(task_entity)) else {
            continue;
        };
        worker.state = WorkerState::EnRouteToPickup;
        worker.assigned_task = Some(binding.task);
        task.state = TaskState::Assigned;
        task.assigned_worker = Some(binding.worker);
        task.assigned_at = Some(now);
        task.pickup_distance = Some(binding.pickup_distance);

        let wait = now.saturating_sub(task.release_time);
        metrics.record_assignment(wait, binding.pickup_distance);
        info!(
            tick = now,
            worker = %binding.worker,
            task = %binding.task,
            pickup_distance = binding.pickup_distance,
            wait,
            "task assigned"
        );
    }
}

/// Validate a batch of bindings against the current world state.
pub fn check_bindings(
    bindings: &[Binding],
    now: Tick,
    pool: &ActivePool,
    workers: &Query<(&mut Worker, &Position)>,
    tasks: &Query<&mut Task>,
) -> Result<(), InvariantViolation> {
    let mut bound_workers = HashSet::new();
    let mut bound_tasks = HashSet::new();
    for binding in bindings {
        if !bound_workers.insert(binding.worker) {
            return Err(InvariantViolation::WorkerBoundTwice(binding.worker));
        }
        if !bound_tasks.insert(binding.task) {
            return Err(InvariantViolation::TaskBoundTwice(binding.task));
        }

        let (worker, _) = pool
            .worker(binding.worker)
            .and_then(|entity| workers.get(entity).ok())
            .ok_or(InvariantViolation::UnknownWorker(binding.worker))?;
        if !worker.is_idle() {
            return Err(InvariantViolation::WorkerNotIdle(binding.worker));
        }

        let task = pool
            .task(binding.task)
            .and_then(|entity| tasks.get(entity).ok())
            .ok_or(InvariantViolation::UnknownTask(binding.task))?;
        if task.state != TaskState::Pending {
            return Err(InvariantViolation::TaskNotPending(binding.task));
        }
        if !task.is_assignable_at(now) {
            return Err(InvariantViolation::OutsideValidityWindow {
                task: task.id,
                tick: now,
                release_time: task.release_time,
                expiry_time: task.expiry_time,
            });
        }
    }
    Ok(())
}
