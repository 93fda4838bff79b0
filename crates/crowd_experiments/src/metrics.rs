//! Metrics extraction from finished simulations.

use crowd_sim::metrics::CompletedTaskRecord;
use crowd_sim::Simulation;
use serde::Serialize;

/// Aggregated metrics from a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub ticks: u64,
    pub workers_admitted: u64,
    pub tasks_admitted: u64,
    pub tasks_completed: u64,
    pub tasks_expired: u64,
    pub tasks_open: u64,
    pub data_errors: u64,
    /// Completed / (completed + expired).
    pub completion_rate: f64,
    pub mean_wait_ticks: f64,
    pub median_wait_ticks: f64,
    pub p90_wait_ticks: f64,
    pub mean_service_ticks: f64,
    pub p90_service_ticks: f64,
    pub mean_wait_secs: f64,
    pub mean_pickup_distance: f64,
    pub total_travel_distance: f64,
    pub jain_fairness: f64,
    pub utility_difference: f64,
    /// Largest per-worker fairness EWMA seen on any tick.
    pub peak_fairness_ewma: f64,
}

/// Pull a [`SimulationResult`] out of a finished run.
pub fn extract_metrics(sim: &Simulation) -> SimulationResult {
    let summary = sim.summary();
    let completed = sim.metrics().completed_tasks();
    let waits = sorted(completed.iter().map(CompletedTaskRecord::wait_ticks));
    let services = sorted(completed.iter().map(CompletedTaskRecord::service_ticks));
    let peak_fairness_ewma = sim
        .metrics()
        .records()
        .iter()
        .map(|r| r.fairness_ewma_max)
        .fold(0.0, f64::max);

    SimulationResult {
        ticks: summary.ticks,
        workers_admitted: summary.workers_admitted,
        tasks_admitted: summary.tasks_admitted,
        tasks_completed: summary.tasks_completed,
        tasks_expired: summary.tasks_expired,
        tasks_open: summary.tasks_open,
        data_errors: summary.data_errors,
        completion_rate: summary.completion_rate,
        mean_wait_ticks: summary.mean_wait_ticks,
        median_wait_ticks: percentile(&waits, 0.5),
        p90_wait_ticks: percentile(&waits, 0.9),
        mean_service_ticks: summary.mean_service_ticks,
        p90_service_ticks: percentile(&services, 0.9),
        mean_wait_secs: summary.mean_wait_secs,
        mean_pickup_distance: summary.mean_pickup_distance,
        total_travel_distance: summary.total_travel_distance,
        jain_fairness: summary.jain_fairness,
        utility_difference: summary.utility_difference,
        peak_fairness_ewma,
    }
}

fn sorted(values: impl Iterator<Item = u64>) -> Vec<u64> {
    let mut values: Vec<u64> = values.collect();
    values.sort_unstable();
    values
}

/// Nearest-rank percentile of sorted values; 0.0 when empty.
fn percentile(sorted: &[u64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64 * p).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1] as f64
}
