//! Admission: materializes queued records whose release time has come.

use bevy_ecs::prelude::{Commands, Res, ResMut};
use tracing::{debug, warn};

use crate::clock::SimulationClock;
use crate::config::SimConfig;
use crate::ecs::{ActivePool, Position, Task, TaskState, Worker, WorkerId, WorkerState};
use crate::error::DataError;
use crate::input::{EntityRecord, PendingInput, TaskRecord, WorkerRecord};
use crate::metrics::MetricsCollector;

pub fn admission_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    config: Res<SimConfig>,
    mut input: ResMut<PendingInput>,
    mut pool: ResMut<ActivePool>,
    mut metrics: ResMut<MetricsCollector>,
) {
    let now = clock.now();

    for _ in 0..input.take_late_records() {
        reject(now, &DataError::AfterEndOfStream, &mut metrics);
    }

    for record in input.pop_due(now) {
        let admitted = match record {
            EntityRecord::Worker(record) => admit_worker(&mut commands, &config, &mut pool, record),
            EntityRecord::Task(record) => admit_task(&mut commands, &config, &mut pool, record),
        };
        match admitted {
            Ok(Admitted::Worker(worker)) => {
                debug!(tick = now, worker = %worker, "worker admitted");
                metrics.record_worker_admitted(worker);
            }
            Ok(Admitted::Task) => metrics.record_task_admitted(),
            Err(err) => reject(now, &err, &mut metrics),
        }
    }
}

enum Admitted {
    Worker(WorkerId),
    Task,
}

fn reject(now: u64, err: &DataError, metrics: &mut MetricsCollector) {
    warn!(tick = now, error = %err, "input record rejected");
    metrics.record_data_error();
}

fn admit_worker(
    commands: &mut Commands,
    config: &SimConfig,
    pool: &mut ActivePool,
    record: WorkerRecord,
) -> Result<Admitted, DataError> {
    record.validate(config.distance_metric)?;
    if pool.has_seen_worker(record.id) {
        return Err(DataError::DuplicateWorker(record.id));
    }
    let entity = commands
        .spawn((
            Worker {
                id: record.id,
                state: WorkerState::Idle,
                release_time: record.release_time,
                deadline: record.deadline,
                speed: record.speed.unwrap_or(config.speed),
                assigned_task: None,
                completed_tasks: 0,
                idle_ticks: 0,
                fairness_ewma: 0.0,
                distance_travelled: 0.0,
            },
            Position(record.position),
        ))
        .id();
    pool.insert_worker(record.id, entity);
    Ok(Admitted::Worker(record.id))
}

fn admit_task(
    commands: &mut Commands,
    config: &SimConfig,
    pool: &mut ActivePool,
    record: TaskRecord,
) -> Result<Admitted, DataError> {
    record.validate(config.distance_metric)?;
    if pool.has_seen_task(record.id) {
        return Err(DataError::DuplicateTask(record.id));
    }
    let entity = commands
        .spawn(Task {
            id: record.id,
            state: TaskState::Pending,
            pickup: record.pickup,
            dropoff: record.dropoff,
            release_time: record.release_time,
            expiry_time: record.expiry_time,
            assigned_worker: None,
            assigned_at: None,
            picked_up_at: None,
            completed_at: None,
            pickup_distance: None,
        })
        .id();
    pool.insert_task(record.id, entity);
    Ok(Admitted::Task)
}
