use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::SimulationClock;
use crate::ecs::{ActivePool, Task, TaskState, Worker};
use crate::metrics::{MetricsCollector, TickGauges};

/// Samples pool gauges and closes the tick's metrics record.
pub fn metrics_system(
    clock: Res<SimulationClock>,
    pool: Res<ActivePool>,
    mut metrics: ResMut<MetricsCollector>,
    workers: Query<&Worker>,
    tasks: Query<&Task>,
) {
    let now = clock.now();
    let mut gauges = TickGauges::default();

    let mut fairness_sum = 0.0;
    for worker in pool.worker_ids().filter_map(|id| pool.worker(id)).filter_map(|e| workers.get(e).ok()) {
        if worker.is_idle() {
            gauges.idle_workers += 1;
        } else {
            gauges.busy_workers += 1;
        }
        fairness_sum += worker.fairness_ewma;
        gauges.fairness_ewma_max = gauges.fairness_ewma_max.max(worker.fairness_ewma);
    }
    let worker_count = gauges.idle_workers + gauges.busy_workers;
    if worker_count > 0 {
        gauges.fairness_ewma_mean = fairness_sum / worker_count as f64;
    }

    let mut age_sum = 0u64;
    for task in pool.task_ids().filter_map(|id| pool.task(id)).filter_map(|e| tasks.get(e).ok()) {
        if task.state == TaskState::Pending {
            gauges.pending_tasks += 1;
        } else if task.state.is_in_service() {
            gauges.in_service_tasks += 1;
        }
        age_sum += now.saturating_sub(task.release_time);
    }
    let open = gauges.pending_tasks + gauges.in_service_tasks;
    if open > 0 {
        gauges.mean_open_task_age = age_sum as f64 / open as f64;
    }

    let record = metrics.close_tick(now, gauges);
    debug_assert_eq!(record.open_tasks, open as u64, "task accounting drifted");
    debug!(
        tick = now,
        assignments = record.assignments,
        completions = record.completions,
        expirations = record.expirations,
        open_tasks = record.open_tasks,
        "tick closed"
    );
}
