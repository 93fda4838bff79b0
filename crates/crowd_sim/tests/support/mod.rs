#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use crowd_sim::config::SimConfig;
use crowd_sim::ecs::{TaskId, TaskState, WorkerId, WorkerState};
use crowd_sim::input::InputRecord;
use crowd_sim::metrics::{RunSummary, TickRecord};
use crowd_sim::Simulation;

/// Build a simulation from `config` and feed it `records`.
pub fn simulation(config: SimConfig, records: impl IntoIterator<Item = InputRecord>) -> Simulation {
    let mut sim = Simulation::new(config).expect("valid config");
    sim.ingest(records);
    sim
}

/// Observed pairing of one worker and one task while the task was open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedBinding {
    pub worker: WorkerId,
    pub task: TaskId,
    pub assigned_at: u64,
    pub release_time: u64,
    pub expiry_time: u64,
}

/// Everything a checked run observed between ticks.
#[derive(Debug, Default)]
pub struct RunTrace {
    pub records: Vec<TickRecord>,
    pub bindings: BTreeMap<TaskId, ObservedBinding>,
}

/// Steps `sim` to its horizon, checking bijection, uniqueness and
/// conservation after every tick.
pub fn run_checked(sim: &mut Simulation) -> (RunSummary, RunTrace) {
    sim.check_ready().expect("ready to run");
    let mut trace = RunTrace::default();

    while let Some(record) = sim.step() {
        assert_eq!(
            record.completed_total + record.expired_total + record.open_tasks,
            record.tasks_admitted_total,
            "conservation broken at tick {}",
            record.tick
        );
        assert_bijection(sim);

        for task in sim.tasks() {
            if let (Some(worker), Some(assigned_at)) = (task.assigned_worker, task.assigned_at) {
                let observed = ObservedBinding {
                    worker,
                    task: task.id,
                    assigned_at,
                    release_time: task.release_time,
                    expiry_time: task.expiry_time,
                };
                let previous = trace.bindings.insert(task.id, observed);
                if let Some(previous) = previous {
                    assert_eq!(previous, observed, "task {} was rebound", task.id);
                }
            }
        }
        trace.records.push(record);
    }

    let summary = sim.summary();
    assert!(summary.is_conserved(), "summary not conserved: {summary:?}");
    (summary, trace)
}

/// Every busy worker points at a task that points back at it; every bound
/// task points at a busy worker; no worker carries two tasks.
pub fn assert_bijection(sim: &Simulation) {
    let mut seen_workers = BTreeSet::new();
    for task in sim.tasks() {
        match task.state {
            TaskState::Pending => assert_eq!(task.assigned_worker, None, "pending {} bound", task.id),
            TaskState::Assigned | TaskState::PickedUp => {
                let worker_id = task.assigned_worker.expect("in-service task has a worker");
                assert!(seen_workers.insert(worker_id), "{worker_id} bound to two tasks");
                let worker = sim.worker(worker_id).expect("bound worker is active");
                assert_eq!(worker.assigned_task, Some(task.id));
                let expected = if task.state == TaskState::Assigned {
                    WorkerState::EnRouteToPickup
                } else {
                    WorkerState::EnRouteToDropoff
                };
                assert_eq!(worker.state, expected);
            }
            TaskState::Completed | TaskState::Expired => {
                panic!("terminal task {} still in the pool", task.id)
            }
        }
    }
    for worker in sim.workers() {
        match worker.assigned_task {
            Some(task_id) => {
                assert!(!worker.is_idle());
                let task = sim.task(task_id).expect("assigned task is open");
                assert_eq!(task.assigned_worker, Some(worker.id));
            }
            None => assert!(worker.is_idle(), "{} busy without a task", worker.id),
        }
    }
}
