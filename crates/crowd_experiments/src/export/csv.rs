use std::fs::File;
use std::io::Write;
use std::path::Path;

use crowd_sim::metrics::{MetricsSink, RunSummary, TickRecord};
use serde::Serialize;

use crate::error::ExperimentError;
use crate::metrics::SimulationResult;
use crate::parameters::ParameterSet;

/// One CSV row: the varied parameters followed by the run's metrics.
#[derive(Serialize)]
struct ResultRow<'a> {
    experiment_id: &'a str,
    run_id: usize,
    seed: u64,
    policy: &'static str,
    speed: f64,
    max_pickup_radius: f64,
    num_workers: usize,
    num_tasks: usize,
    ticks: u64,
    workers_admitted: u64,
    tasks_admitted: u64,
    tasks_completed: u64,
    tasks_expired: u64,
    tasks_open: u64,
    data_errors: u64,
    completion_rate: f64,
    mean_wait_ticks: f64,
    median_wait_ticks: f64,
    p90_wait_ticks: f64,
    mean_service_ticks: f64,
    p90_service_ticks: f64,
    mean_wait_secs: f64,
    mean_pickup_distance: f64,
    total_travel_distance: f64,
    jain_fairness: f64,
    utility_difference: f64,
    peak_fairness_ewma: f64,
}

impl<'a> ResultRow<'a> {
    fn new(param_set: &'a ParameterSet, result: &SimulationResult) -> Self {
        Self {
            experiment_id: &param_set.experiment_id,
            run_id: param_set.run_id,
            seed: param_set.seed(),
            policy: param_set.config.policy.label(),
            speed: param_set.config.speed,
            max_pickup_radius: param_set.config.max_pickup_radius,
            num_workers: param_set.input.num_workers,
            num_tasks: param_set.input.num_tasks,
            ticks: result.ticks,
            workers_admitted: result.workers_admitted,
            tasks_admitted: result.tasks_admitted,
            tasks_completed: result.tasks_completed,
            tasks_expired: result.tasks_expired,
            tasks_open: result.tasks_open,
            data_errors: result.data_errors,
            completion_rate: result.completion_rate,
            mean_wait_ticks: result.mean_wait_ticks,
            median_wait_ticks: result.median_wait_ticks,
            p90_wait_ticks: result.p90_wait_ticks,
            mean_service_ticks: result.mean_service_ticks,
            p90_service_ticks: result.p90_service_ticks,
            mean_wait_secs: result.mean_wait_secs,
            mean_pickup_distance: result.mean_pickup_distance,
            total_travel_distance: result.total_travel_distance,
            jain_fairness: result.jain_fairness,
            utility_difference: result.utility_difference,
            peak_fairness_ewma: result.peak_fairness_ewma,
        }
    }
}

pub(crate) fn export_results_csv_impl(
    results: &[SimulationResult],
    parameter_sets: &[ParameterSet],
    file: File,
) -> Result<(), ExperimentError> {
    let mut wtr = csv::Writer::from_writer(file);
    for (result, param_set) in results.iter().zip(parameter_sets) {
        wtr.serialize(ResultRow::new(param_set, result))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Streams a run's tick records and summary into two CSV writers.
pub struct CsvMetricsSink<W: Write> {
    ticks: csv::Writer<W>,
    summary: csv::Writer<W>,
}

impl CsvMetricsSink<File> {
    /// Create `ticks.csv` and `summary.csv` inside `dir`.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, ExperimentError> {
        let dir = dir.as_ref();
        Ok(Self::new(
            File::create(dir.join("ticks.csv"))?,
            File::create(dir.join("summary.csv"))?,
        ))
    }
}

impl<W: Write> CsvMetricsSink<W> {
    pub fn new(ticks: W, summary: W) -> Self {
        Self {
            ticks: csv::Writer::from_writer(ticks),
            summary: csv::Writer::from_writer(summary),
        }
    }

    pub fn flush(&mut self) -> Result<(), ExperimentError> {
        self.ticks.flush()?;
        self.summary.flush()?;
        Ok(())
    }
}

impl<W: Write> MetricsSink for CsvMetricsSink<W> {
    type Error = csv::Error;

    fn record_tick(&mut self, record: &TickRecord) -> Result<(), Self::Error> {
        self.ticks.serialize(record)
    }

    fn record_summary(&mut self, summary: &RunSummary) -> Result<(), Self::Error> {
        self.summary.serialize(summary)
    }
}
