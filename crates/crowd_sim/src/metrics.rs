//! Metrics collection: per-tick records, completed-task records, run summary.
//!
//! The collector is filled by the systems during a tick and closed by the
//! metrics system at the end of it. Task accounting is conserved at every
//! tick: `completed + expired + open == tasks admitted`.

use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::clock::Tick;
use crate::ecs::{TaskId, WorkerId};

/// One completed task, recorded when its worker reaches the dropoff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedTaskRecord {
    pub task: TaskId,
    pub worker: WorkerId,
    pub release_time: Tick,
    pub expiry_time: Tick,
    pub assigned_at: Tick,
    pub picked_up_at: Tick,
    pub completed_at: Tick,
    pub pickup_distance: f64,
    pub trip_distance: f64,
}

impl CompletedTaskRecord {
    /// Ticks from release to assignment.
    pub fn wait_ticks(&self) -> u64 {
        self.assigned_at.saturating_sub(self.release_time)
    }

    /// Ticks from assignment to completion.
    pub fn service_ticks(&self) -> u64 {
        self.completed_at.saturating_sub(self.assigned_at)
    }

    /// Ticks from pickup to dropoff.
    pub fn trip_ticks(&self) -> u64 {
        self.completed_at.saturating_sub(self.picked_up_at)
    }
}

/// Pool gauges sampled by the metrics system at the end of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickGauges {
    pub idle_workers: usize,
    pub busy_workers: usize,
    pub pending_tasks: usize,
    pub in_service_tasks: usize,
    pub mean_open_task_age: f64,
    pub fairness_ewma_mean: f64,
    pub fairness_ewma_max: f64,
}

/// Flat per-tick record, suitable for CSV rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickRecord {
    pub tick: Tick,
    pub assignments: u64,
    pub pickups: u64,
    pub completions: u64,
    pub expirations: u64,
    /// Sum over this tick's assignments of `assigned_at - release_time`.
    pub wait_time: u64,
    pub travel_distance: f64,
    pub workers_admitted: u64,
    pub tasks_admitted: u64,
    pub workers_evicted: u64,
    pub data_errors: u64,
    pub idle_workers: usize,
    pub busy_workers: usize,
    pub pending_tasks: usize,
    pub in_service_tasks: usize,
    pub tasks_admitted_total: u64,
    pub completed_total: u64,
    pub expired_total: u64,
    pub open_tasks: u64,
    pub jain_fairness: f64,
    pub utility_difference: f64,
    pub mean_open_task_age: f64,
    pub fairness_ewma_mean: f64,
    pub fairness_ewma_max: f64,
}

/// Flat end-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub tick_unit_secs: f64,
    pub workers_admitted: u64,
    pub workers_evicted: u64,
    pub tasks_admitted: u64,
    pub tasks_completed: u64,
    pub tasks_expired: u64,
    /// Tasks still pending or in service when the run stopped.
    pub tasks_open: u64,
    pub data_errors: u64,
    pub assignments: u64,
    pub completion_rate: f64,
    pub mean_wait_ticks: f64,
    pub mean_service_ticks: f64,
    pub mean_wait_secs: f64,
    pub mean_service_secs: f64,
    pub mean_pickup_distance: f64,
    pub total_travel_distance: f64,
    pub jain_fairness: f64,
    pub utility_difference: f64,
}

impl RunSummary {
    pub fn is_conserved(&self) -> bool {
        self.tasks_completed + self.tasks_expired + self.tasks_open == self.tasks_admitted
    }
}

/// Receives metrics for serialization outside the core.
pub trait MetricsSink {
    type Error;

    fn record_tick(&mut self, record: &TickRecord) -> Result<(), Self::Error>;

    fn record_summary(&mut self, summary: &RunSummary) -> Result<(), Self::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
struct TickCounters {
    assignments: u64,
    pickups: u64,
    completions: u64,
    expirations: u64,
    wait_time: u64,
    travel_distance: f64,
    workers_admitted: u64,
    tasks_admitted: u64,
    workers_evicted: u64,
    data_errors: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    workers_admitted: u64,
    workers_evicted: u64,
    tasks_admitted: u64,
    completed: u64,
    expired: u64,
    data_errors: u64,
    assignments: u64,
    wait_time: u64,
    pickup_distance: f64,
    travel_distance: f64,
}

/// Collects per-tick and run-level metrics.
#[derive(Debug, Resource)]
pub struct MetricsCollector {
    tick_unit_secs: f64,
    current: TickCounters,
    totals: Totals,
    records: Vec<TickRecord>,
    completed: Vec<CompletedTaskRecord>,
    /// Completions per admitted worker, including workers that left the pool.
    worker_completions: BTreeMap<WorkerId, u32>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MetricsCollector {
    pub fn new(tick_unit_secs: f64) -> Self {
        Self {
            tick_unit_secs,
            current: TickCounters::default(),
            totals: Totals::default(),
            records: Vec::new(),
            completed: Vec::new(),
            worker_completions: BTreeMap::new(),
        }
    }

    pub fn record_worker_admitted(&mut self, worker: WorkerId) {
        self.current.workers_admitted += 1;
        self.totals.workers_admitted += 1;
        self.worker_completions.entry(worker).or_insert(0);
    }

    pub fn record_task_admitted(&mut self) {
        self.current.tasks_admitted += 1;
        self.totals.tasks_admitted += 1;
    }

    pub fn record_data_error(&mut self) {
        self.current.data_errors += 1;
        self.totals.data_errors += 1;
    }

    pub fn record_worker_evicted(&mut self) {
        self.current.workers_evicted += 1;
        self.totals.workers_evicted += 1;
    }

    pub fn record_expired(&mut self) {
        self.current.expirations += 1;
        self.totals.expired += 1;
    }

    pub fn record_assignment(&mut self, wait_ticks: u64, pickup_distance: f64) {
        self.current.assignments += 1;
        self.current.wait_time += wait_ticks;
        self.totals.assignments += 1;
        self.totals.wait_time += wait_ticks;
        self.totals.pickup_distance += pickup_distance;
    }

    pub fn record_pickup(&mut self) {
        self.current.pickups += 1;
    }

    pub fn record_travel(&mut self, distance: f64) {
        self.current.travel_distance += distance;
        self.totals.travel_distance += distance;
    }

    pub fn record_completion(&mut self, record: CompletedTaskRecord) {
        self.current.completions += 1;
        self.totals.completed += 1;
        *self.worker_completions.entry(record.worker).or_insert(0) += 1;
        self.completed.push(record);
    }

    /// Tasks admitted and not yet completed or expired.
    pub fn open_tasks(&self) -> u64 {
        self.totals
            .tasks_admitted
            .saturating_sub(self.totals.completed + self.totals.expired)
    }

    /// Seal the counters for `tick` into a [`TickRecord`] and reset them.
    pub fn close_tick(&mut self, tick: Tick, gauges: TickGauges) -> &TickRecord {
        let counters = std::mem::take(&mut self.current);
        let completions: Vec<f64> = self.worker_completions.values().map(|&c| c as f64).collect();
        self.records.push(TickRecord {
            tick,
            assignments: counters.assignments,
            pickups: counters.pickups,
            completions: counters.completions,
            expirations: counters.expirations,
            wait_time: counters.wait_time,
            travel_distance: counters.travel_distance,
            workers_admitted: counters.workers_admitted,
            tasks_admitted: counters.tasks_admitted,
            workers_evicted: counters.workers_evicted,
            data_errors: counters.data_errors,
            idle_workers: gauges.idle_workers,
            busy_workers: gauges.busy_workers,
            pending_tasks: gauges.pending_tasks,
            in_service_tasks: gauges.in_service_tasks,
            tasks_admitted_total: self.totals.tasks_admitted,
            completed_total: self.totals.completed,
            expired_total: self.totals.expired,
            open_tasks: self.open_tasks(),
            jain_fairness: jains_fairness(&completions),
            utility_difference: utility_difference(&completions),
            mean_open_task_age: gauges.mean_open_task_age,
            fairness_ewma_mean: gauges.fairness_ewma_mean,
            fairness_ewma_max: gauges.fairness_ewma_max,
        });
        // Just pushed.
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[TickRecord] {
        &self.records
    }

    pub fn last_record(&self) -> Option<&TickRecord> {
        self.records.last()
    }

    pub fn completed_tasks(&self) -> &[CompletedTaskRecord] {
        &self.completed
    }

    pub fn worker_completions(&self) -> &BTreeMap<WorkerId, u32> {
        &self.worker_completions
    }

    /// Summary over every closed tick. Valid at any tick boundary.
    pub fn summary(&self) -> RunSummary {
        let totals = &self.totals;
        let terminal = totals.completed + totals.expired;
        let completion_rate = if terminal == 0 {
            0.0
        } else {
            totals.completed as f64 / terminal as f64
        };
        let mean_wait_ticks = mean(totals.wait_time as f64, totals.assignments);
        let service: u64 = self.completed.iter().map(CompletedTaskRecord::service_ticks).sum();
        let mean_service_ticks = mean(service as f64, totals.completed);
        let completions: Vec<f64> = self.worker_completions.values().map(|&c| c as f64).collect();

        RunSummary {
            ticks: self.records.len() as u64,
            tick_unit_secs: self.tick_unit_secs,
            workers_admitted: totals.workers_admitted,
            workers_evicted: totals.workers_evicted,
            tasks_admitted: totals.tasks_admitted,
            tasks_completed: totals.completed,
            tasks_expired: totals.expired,
            tasks_open: self.open_tasks(),
            data_errors: totals.data_errors,
            assignments: totals.assignments,
            completion_rate,
            mean_wait_ticks,
            mean_service_ticks,
            mean_wait_secs: mean_wait_ticks * self.tick_unit_secs,
            mean_service_secs: mean_service_ticks * self.tick_unit_secs,
            mean_pickup_distance: mean(totals.pickup_distance, totals.assignments),
            total_travel_distance: totals.travel_distance,
            jain_fairness: jains_fairness(&completions),
            utility_difference: utility_difference(&completions),
        }
    }

    /// Alias for [`Self::summary`] at the end of a run.
    pub fn finalize(&self) -> RunSummary {
        self.summary()
    }

    /// Hand every tick record and the summary to `sink`.
    pub fn export_to<S: MetricsSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        for record in &self.records {
            sink.record_tick(record)?;
        }
        sink.record_summary(&self.summary())
    }
}

fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Jain's fairness index `(Σx)² / (n·Σx²)`; 1.0 for no values or all zeros.
pub fn jains_fairness(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    let sum_sq: f64 = values.iter().map(|x| x * x).sum();
    let denominator = values.len() as f64 * sum_sq;
    if denominator == 0.0 {
        1.0
    } else {
        sum * sum / denominator
    }
}

/// Mean absolute deviation from the mean; 0.0 is perfectly equal.
pub fn utility_difference(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let avg = values.iter().sum::<f64>() / n;
    values.iter().map(|x| (x - avg).abs()).sum::<f64>() / n
}
