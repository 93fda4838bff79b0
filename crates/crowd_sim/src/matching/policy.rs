use rayon::prelude::*;
use std::collections::HashMap;

use crate::clock::Tick;
use crate::ecs::{TaskId, WorkerId};
use crate::geometry::{ticks_to_cover, DistanceMetric, Point};
use crate::spatial::SpatialIndex;

/// An idle worker offered to the policy this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerCandidate {
    pub id: WorkerId,
    pub position: Point,
    pub speed: f64,
    pub deadline: Option<Tick>,
    pub idle_ticks: u64,
    pub fairness_ewma: f64,
}

/// A pending task offered to the policy this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskCandidate {
    pub id: TaskId,
    pub pickup: Point,
    pub dropoff: Point,
    pub release_time: Tick,
    pub expiry_time: Tick,
}

/// A worker/task pair that passed every feasibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    pub worker: WorkerId,
    pub task: TaskId,
    pub pickup_distance: f64,
    pub pickup_tick: Tick,
}

/// Output of a policy: bind `worker` to `task` this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub worker: WorkerId,
    pub task: TaskId,
    pub pickup_distance: f64,
}

impl From<&CandidatePair> for Binding {
    fn from(pair: &CandidatePair) -> Self {
        Self {
            worker: pair.worker,
            task: pair.task,
            pickup_distance: pair.pickup_distance,
        }
    }
}

/// Spatial and temporal feasibility for the current tick.
///
/// Arrival estimates mirror the movement model: the first step is taken on the
/// tick of assignment, a worker arrives on the tick its remaining distance
/// fits in one step, and the dropoff leg starts on the tick after pickup.
#[derive(Clone, Copy)]
pub struct Feasibility<'a> {
    pub now: Tick,
    pub max_pickup_radius: f64,
    pub index: &'a SpatialIndex,
}

impl<'a> Feasibility<'a> {
    pub fn new(now: Tick, max_pickup_radius: f64, index: &'a SpatialIndex) -> Self {
        Self {
            now,
            max_pickup_radius,
            index,
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.index.metric()
    }

    /// Tick on which a worker starting now reaches a pickup `distance` away.
    pub fn pickup_arrival_tick(&self, distance: f64, speed: f64) -> Tick {
        self.now
            .saturating_add(ticks_to_cover(distance, speed).saturating_sub(1))
    }

    /// Tick on which the task would be completed.
    pub fn completion_tick(&self, pickup_tick: Tick, task: &TaskCandidate, speed: f64) -> Tick {
        let trip = self.metric().distance(task.pickup, task.dropoff);
        pickup_tick.saturating_add(ticks_to_cover(trip, speed).max(1))
    }

    /// Full check for one pair at a known pickup distance. `None` if the pair
    /// is infeasible.
    fn evaluate_at(
        &self,
        worker: &WorkerCandidate,
        task: &TaskCandidate,
        distance: f64,
    ) -> Option<CandidatePair> {
        if distance.is_nan() || distance > self.max_pickup_radius {
            return None;
        }
        if task.release_time > self.now || self.now >= task.expiry_time {
            return None;
        }
        let pickup_tick = self.pickup_arrival_tick(distance, worker.speed);
        if pickup_tick >= task.expiry_time {
            return None;
        }
        if let Some(deadline) = worker.deadline {
            if self.completion_tick(pickup_tick, task, worker.speed) > deadline {
                return None;
            }
        }
        Some(CandidatePair {
            worker: worker.id,
            task: task.id,
            pickup_distance: distance,
            pickup_tick,
        })
    }

    /// Every feasible pair among `workers` × `tasks`, found through the spatial
    /// index. Sorted by pickup distance, then worker id, then task id.
    pub fn candidate_pairs(
        &self,
        workers: &[WorkerCandidate],
        tasks: &[TaskCandidate],
    ) -> Vec<CandidatePair> {
        if workers.is_empty() || tasks.is_empty() {
            return Vec::new();
        }
        let by_id: HashMap<WorkerId, &WorkerCandidate> =
            workers.iter().map(|worker| (worker.id, worker)).collect();

        let mut pairs: Vec<CandidatePair> = tasks
            .par_iter()
            .flat_map_iter(|task| {
                self.index
                    .workers_nearby(task.pickup, self.max_pickup_radius)
                    .into_iter()
                    .filter_map(|neighbor| {
                        let worker = by_id.get(&neighbor.id)?;
                        self.evaluate_at(worker, task, neighbor.distance)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        sort_pairs(&mut pairs);
        pairs
    }
}

/// Nearest first; equal distances fall back to lower worker id, then lower
/// task id.
pub fn sort_pairs(pairs: &mut [CandidatePair]) {
    pairs.sort_by(|a, b| {
        a.pickup_distance
            .total_cmp(&b.pickup_distance)
            .then_with(|| a.worker.cmp(&b.worker))
            .then_with(|| a.task.cmp(&b.task))
    });
}

/// Assignment strategy: turns idle workers and pending tasks into bindings.
///
/// Implementations must return conflict-free bindings (each worker and each
/// task at most once) drawn from feasible pairs, and must be deterministic for
/// identical inputs. Entities left unmatched are retried next tick.
pub trait AssignmentPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn assign(
        &self,
        workers: &[WorkerCandidate],
        tasks: &[TaskCandidate],
        feasibility: &Feasibility<'_>,
    ) -> Vec<Binding>;
}
