use std::collections::{HashMap, HashSet};

use crate::ecs::WorkerId;

use super::policy::{AssignmentPolicy, Binding, CandidatePair, Feasibility, TaskCandidate, WorkerCandidate};

/// Per-task scoring that trades pickup distance against fairness.
///
/// Tasks are visited in id order. Each takes the free feasible worker with the
/// highest score:
///
/// ```text
/// score = fairness_weight * idle_ticks
///       + starvation_weight * ln(1 + task_age)
///       - distance_weight * pickup_distance
/// ```
///
/// Long-idle workers and old tasks are favoured. Equal scores go to the nearer
/// worker, then the lower worker id. With `min_score` set, a task whose best
/// score falls below it is left for a later tick.
#[derive(Debug, Clone)]
pub struct CompositePolicy {
    pub fairness_weight: f64,
    pub starvation_weight: f64,
    pub distance_weight: f64,
    pub min_score: Option<f64>,
}

impl Default for CompositePolicy {
    fn default() -> Self {
        Self {
            fairness_weight: 1.0,
            starvation_weight: 1.0,
            distance_weight: 0.5,
            min_score: None,
        }
    }
}

impl CompositePolicy {
    pub fn score(&self, worker: &WorkerCandidate, task: &TaskCandidate, pair: &CandidatePair, now: u64) -> f64 {
        let age = now.saturating_sub(task.release_time) as f64;
        self.fairness_weight * worker.idle_ticks as f64 + self.starvation_weight * age.ln_1p()
            - self.distance_weight * pair.pickup_distance
    }
}

impl AssignmentPolicy for CompositePolicy {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn assign(
        &self,
        workers: &[WorkerCandidate],
        tasks: &[TaskCandidate],
        feasibility: &Feasibility<'_>,
    ) -> Vec<Binding> {
        let workers_by_id: HashMap<WorkerId, &WorkerCandidate> =
            workers.iter().map(|w| (w.id, w)).collect();

        // Candidate pairs grouped per task, keeping the deterministic pair order.
        let mut pairs_by_task: HashMap<_, Vec<CandidatePair>> = HashMap::new();
        for pair in feasibility.candidate_pairs(workers, tasks) {
            pairs_by_task.entry(pair.task).or_default().push(pair);
        }

        let mut ordered: Vec<&TaskCandidate> = tasks.iter().collect();
        ordered.sort_by_key(|task| task.id);

        let mut used_workers = HashSet::new();
        let mut bindings = Vec::new();
        for task in ordered {
            let Some(pairs) = pairs_by_task.get(&task.id) else {
                continue;
            };
            let mut best: Option<(f64, &CandidatePair)> = None;
            for pair in pairs {
                if used_workers.contains(&pair.worker) {
                    continue;
                }
                let Some(worker) = workers_by_id.get(&pair.worker) else {
                    continue;
                };
                let score = self.score(worker, task, pair, feasibility.now);
                // Strictly greater: earlier pairs (nearer, lower id) win ties.
                if best.map_or(true, |(best_score, _)| score > best_score) {
                    best = Some((score, pair));
                }
            }
            if let Some((score, pair)) = best {
                if self.min_score.is_some_and(|min| score < min) {
                    continue;
                }
                used_workers.insert(pair.worker);
                bindings.push(Binding::from(pair));
            }
        }
        bindings
    }
}
