use std::collections::HashSet;

use super::policy::{AssignmentPolicy, Binding, Feasibility, TaskCandidate, WorkerCandidate};

/// Greedy nearest-feasible matching.
///
/// Walks the sorted candidate pairs and binds each pair whose worker and task
/// are both still free. Pairs are ordered by pickup distance; ties go to the
/// lower worker id, then the lower task id, so runs are reproducible.
#[derive(Debug, Default)]
pub struct GreedyPolicy;

impl AssignmentPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn assign(
        &self,
        workers: &[WorkerCandidate],
        tasks: &[TaskCandidate],
        feasibility: &Feasibility<'_>,
    ) -> Vec<Binding> {
        let mut used_workers = HashSet::new();
        let mut used_tasks = HashSet::new();
        let mut bindings = Vec::new();

        for pair in feasibility.candidate_pairs(workers, tasks) {
            if used_workers.contains(&pair.worker) || used_tasks.contains(&pair.task) {
                continue;
            }
            used_workers.insert(pair.worker);
            used_tasks.insert(pair.task);
            bindings.push(Binding::from(&pair));
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{TaskId, WorkerId};
    use crate::geometry::{DistanceMetric, Point};
    use crate::spatial::{Bucketing, SpatialIndex};

    fn worker(id: u64, lat: f64, lon: f64) -> WorkerCandidate {
        WorkerCandidate {
            id: WorkerId(id),
            position: Point::new(lat, lon),
            speed: 1.0,
            deadline: None,
            idle_ticks: 0,
            fairness_ewma: 0.0,
        }
    }

    fn task(id: u64, lat: f64, lon: f64, expiry_time: u64) -> TaskCandidate {
        TaskCandidate {
            id: TaskId(id),
            pickup: Point::new(lat, lon),
            dropoff: Point::new(lat + 1.0, lon),
            release_time: 0,
            expiry_time,
        }
    }

    fn index_for(workers: &[WorkerCandidate]) -> SpatialIndex {
        let mut index = SpatialIndex::new(Bucketing::Grid { cell_size: 1.0 }, DistanceMetric::Euclidean);
        for w in workers {
            index.insert_worker(w.id, w.position);
        }
        index
    }

    #[test]
    fn equidistant_workers_tie_break_on_lower_id() {
        let workers = [worker(5, 1.0, 0.0), worker(3, -1.0, 0.0)];
        let tasks = [task(1, 0.0, 0.0, 10)];
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 5.0, &index);

        let bindings = GreedyPolicy.assign(&workers, &tasks, &feasibility);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].worker, WorkerId(3));
        assert_eq!(bindings[0].task, TaskId(1));
    }

    #[test]
    fn nearest_pair_is_bound_first() {
        // w1 is nearest to both tasks; t2 is closer so w1 takes t2 and w2 gets t1.
        let workers = [worker(1, 0.0, 0.0), worker(2, 0.0, 4.0)];
        let tasks = [task(1, 0.0, 2.0, 10), task(2, 0.0, 0.5, 10)];
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 5.0, &index);

        let mut bindings: Vec<_> = GreedyPolicy
            .assign(&workers, &tasks, &feasibility)
            .into_iter()
            .map(|b| (b.worker, b.task))
            .collect();
        bindings.sort();
        assert_eq!(
            bindings,
            vec![(WorkerId(1), TaskId(2)), (WorkerId(2), TaskId(1))]
        );
    }

    #[test]
    fn pairs_outside_radius_or_arriving_after_expiry_are_skipped() {
        let workers = [worker(1, 0.0, 0.0)];
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 5.0, &index);

        // 6 units away: beyond the radius.
        let far = [task(1, 6.0, 0.0, 100)];
        assert!(GreedyPolicy.assign(&workers, &far, &feasibility).is_empty());

        // 4 units away: arrives on tick 3, task expires at 3.
        let late = [task(2, 4.0, 0.0, 3)];
        assert!(GreedyPolicy.assign(&workers, &late, &feasibility).is_empty());

        // Same distance, expiry 4: arrives on tick 3 < 4.
        let ok = [task(3, 4.0, 0.0, 4)];
        assert_eq!(GreedyPolicy.assign(&workers, &ok, &feasibility).len(), 1);
    }

    #[test]
    fn worker_deadline_limits_feasible_tasks() {
        let mut w = worker(1, 0.0, 0.0);
        // Pickup at tick 0, one tick of dropoff: completes on tick 1.
        w.deadline = Some(0);
        let workers = [w];
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 5.0, &index);
        let tasks = [task(1, 0.0, 0.0, 10)];
        assert!(GreedyPolicy.assign(&workers, &tasks, &feasibility).is_empty());

        let workers = [WorkerCandidate {
            deadline: Some(1),
            ..w
        }];
        assert_eq!(GreedyPolicy.assign(&workers, &tasks, &feasibility).len(), 1);
    }

    #[test]
    fn repeated_runs_produce_identical_bindings() {
        let workers: Vec<_> = (0..20)
            .map(|i| worker(i, (i % 5) as f64, (i / 5) as f64))
            .collect();
        let tasks: Vec<_> = (0..15)
            .map(|i| task(i, (i % 3) as f64 + 0.5, (i % 4) as f64, 50))
            .collect();
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 3.0, &index);

        let first = GreedyPolicy.assign(&workers, &tasks, &feasibility);
        for _ in 0..5 {
            assert_eq!(GreedyPolicy.assign(&workers, &tasks, &feasibility), first);
        }
    }
}
