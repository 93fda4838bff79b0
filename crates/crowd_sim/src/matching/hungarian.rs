//! Hungarian (Kuhn-Munkres) matching over the feasible pairs of a tick.
//!
//! Maximizes the number of bindings first, then minimizes the total pickup
//! distance among maximum-size matchings.

use std::collections::BTreeSet;

use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;

use super::policy::{AssignmentPolicy, Binding, CandidatePair, Feasibility, TaskCandidate, WorkerCandidate};

/// Integer cost units per distance unit at full resolution.
const COST_UNITS: f64 = 1_000_000.0;

/// Upper bound on the magnitude of any matching's total weight, far enough
/// below `i64::MAX` that the solver's label sums stay exact.
const WEIGHT_BUDGET: f64 = (i64::MAX / 16) as f64;

/// Integer pickup costs for one tick, negated for the maximizing solver.
///
/// An unmatched cell costs more than every feasible cell of a full matching
/// combined, so one more binding always outweighs any distance saving.
struct PickupCosts {
    units_per_distance: f64,
    unmatched: i64,
}

impl PickupCosts {
    fn for_pairs(pairs: &[CandidatePair], rows: usize) -> Self {
        let longest = pairs.iter().map(|p| p.pickup_distance).fold(0.0_f64, f64::max);
        let rows_f = rows as f64;
        let units_per_distance = if longest > 0.0 {
            COST_UNITS.min(WEIGHT_BUDGET / ((rows_f * rows_f + rows_f) * longest))
        } else {
            COST_UNITS
        };
        let mut costs = Self {
            units_per_distance,
            unmatched: 0,
        };
        costs.unmatched = (rows as i64).saturating_mul(costs.cost(longest)).saturating_add(1);
        costs
    }

    fn cost(&self, distance: f64) -> i64 {
        (distance * self.units_per_distance).round() as i64
    }

    fn weight(&self, distance: f64) -> i64 {
        -self.cost(distance)
    }
}

/// Global minimum-distance matching.
#[derive(Debug, Default)]
pub struct HungarianPolicy;

impl HungarianPolicy {
    fn solve(pairs: &[CandidatePair]) -> Vec<Binding> {
        let workers: Vec<_> = pairs.iter().map(|p| p.worker).collect::<BTreeSet<_>>().into_iter().collect();
        let tasks: Vec<_> = pairs.iter().map(|p| p.task).collect::<BTreeSet<_>>().into_iter().collect();

        // Kuhn-Munkres requires rows <= columns, so the smaller side becomes rows.
        let workers_are_rows = workers.len() <= tasks.len();
        let (rows, cols) = if workers_are_rows {
            (workers.len(), tasks.len())
        } else {
            (tasks.len(), workers.len())
        };

        let costs = PickupCosts::for_pairs(pairs, rows);
        let mut weights = Matrix::new(rows, cols, -costs.unmatched);
        let mut cell_pair = vec![None; rows * cols];
        for (i, pair) in pairs.iter().enumerate() {
            let (Ok(w), Ok(t)) = (workers.binary_search(&pair.worker), tasks.binary_search(&pair.task)) else {
                continue;
            };
            let (row, col) = if workers_are_rows { (w, t) } else { (t, w) };
            weights[(row, col)] = costs.weight(pair.pickup_distance);
            cell_pair[row * cols + col] = Some(i);
        }
        let (_total, assignments) = kuhn_munkres(&weights);

        let mut bindings: Vec<Binding> = assignments
            .iter()
            .enumerate()
            .filter_map(|(row, &col)| cell_pair[row * cols + col])
            .map(|i| Binding::from(&pairs[i]))
            .collect();
        bindings.sort_by_key(|b| (b.worker, b.task));
        bindings
    }
}

impl AssignmentPolicy for HungarianPolicy {
    fn name(&self) -> &'static str {
        "hungarian"
    }

    fn assign(
        &self,
        workers: &[WorkerCandidate],
        tasks: &[TaskCandidate],
        feasibility: &Feasibility<'_>,
    ) -> Vec<Binding> {
        let pairs = feasibility.candidate_pairs(workers, tasks);
        if pairs.is_empty() {
            return Vec::new();
        }
        Self::solve(&pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{TaskId, WorkerId};
    use crate::geometry::{DistanceMetric, Point};
    use crate::matching::GreedyPolicy;
    use crate::spatial::{Bucketing, SpatialIndex};

    fn worker(id: u64, lon: f64) -> WorkerCandidate {
        WorkerCandidate {
            id: WorkerId(id),
            position: Point::new(0.0, lon),
            speed: 1.0,
            deadline: None,
            idle_ticks: 0,
            fairness_ewma: 0.0,
        }
    }

    fn task(id: u64, lon: f64) -> TaskCandidate {
        TaskCandidate {
            id: TaskId(id),
            pickup: Point::new(0.0, lon),
            dropoff: Point::new(1.0, lon),
            release_time: 0,
            expiry_time: 100,
        }
    }

    fn index_for(workers: &[WorkerCandidate]) -> SpatialIndex {
        let mut index = SpatialIndex::new(Bucketing::Grid { cell_size: 1.0 }, DistanceMetric::Euclidean);
        for w in workers {
            index.insert_worker(w.id, w.position);
        }
        index
    }

    fn total_distance(bindings: &[Binding]) -> f64 {
        bindings.iter().map(|b| b.pickup_distance).sum()
    }

    #[test]
    fn beats_greedy_on_total_distance() {
        // Greedy binds w1-t1 (0.9) and strands t2 with w2 at 3.1.
        // Optimal: w1-t2 (1.1) + w2-t1 (1.1).
        let workers = [worker(1, 1.0), worker(2, -1.0)];
        let tasks = [task(1, 0.1), task(2, 2.1)];
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 5.0, &index);

        let greedy = GreedyPolicy.assign(&workers, &tasks, &feasibility);
        let optimal = HungarianPolicy.assign(&workers, &tasks, &feasibility);
        assert_eq!(greedy.len(), 2);
        assert_eq!(optimal.len(), 2);
        assert!((total_distance(&optimal) - 2.2).abs() < 1e-9);
        assert!(total_distance(&optimal) < total_distance(&greedy));
    }

    #[test]
    fn infeasible_pairs_are_never_bound() {
        // w2 is out of range of every task; only one binding is possible.
        let workers = [worker(1, 0.0), worker(2, 50.0)];
        let tasks = [task(1, 1.0), task(2, 2.0)];
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 5.0, &index);

        let bindings = HungarianPolicy.assign(&workers, &tasks, &feasibility);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].worker, WorkerId(1));
    }

    #[test]
    fn long_pairs_still_maximise_bindings() {
        // w1 can take either task, w2 only t1. Binding both needs two
        // million-unit pickups, which must still beat binding w1 to t1 alone.
        let workers = [worker(1, 0.0), worker(2, -1.0e6)];
        let tasks = [
            TaskCandidate {
                expiry_time: 10,
                ..task(1, 0.0)
            },
            TaskCandidate {
                expiry_time: 10,
                ..task(2, 1.0e6)
            },
        ];
        let workers = workers.map(|w| WorkerCandidate { speed: 1.0e6, ..w });
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 1.5e6, &index);

        let bindings = HungarianPolicy.assign(&workers, &tasks, &feasibility);
        let pairs: Vec<_> = bindings.iter().map(|b| (b.worker, b.task)).collect();
        assert_eq!(
            pairs,
            vec![(WorkerId(1), TaskId(2)), (WorkerId(2), TaskId(1))]
        );
        assert!((total_distance(&bindings) - 2.0e6).abs() < 1e-3);
    }

    #[test]
    fn more_workers_than_tasks() {
        let workers = [worker(1, 0.0), worker(2, 1.0), worker(3, 2.0)];
        let tasks = [task(1, 2.0)];
        let index = index_for(&workers);
        let feasibility = Feasibility::new(0, 5.0, &index);

        let bindings = HungarianPolicy.assign(&workers, &tasks, &feasibility);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].worker, WorkerId(3));
    }
}
