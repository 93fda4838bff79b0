//! Parallel simulation execution using rayon.
//!
//! Every run builds its own [`Simulation`] (and so its own ECS world); runs
//! share nothing and can execute on any thread.

use crowd_sim::synthetic::SyntheticStream;
use crowd_sim::Simulation;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::debug;

use crate::error::ExperimentError;
use crate::metrics::{extract_metrics, SimulationResult};
use crate::parameters::ParameterSet;

/// Run one parameter set to completion.
///
/// # Errors
///
/// Returns [`ExperimentError::Config`] when the configuration is rejected,
/// either on its own or against the generated stream.
pub fn run_single_simulation(param_set: &ParameterSet) -> Result<SimulationResult, ExperimentError> {
    let config_error = |source| ExperimentError::Config {
        experiment_id: param_set.experiment_id.clone(),
        run_id: param_set.run_id,
        source,
    };

    let mut sim = Simulation::new(param_set.config.clone()).map_err(config_error)?;
    sim.ingest(SyntheticStream::new(&param_set.input));
    sim.run().map_err(config_error)?;

    let result = extract_metrics(&sim);
    debug!(
        run_id = param_set.run_id,
        policy = param_set.config.policy.label(),
        completion_rate = result.completion_rate,
        "run finished"
    );
    Ok(result)
}

/// Run multiple simulations in parallel with a progress bar.
///
/// Results come back in the same order as `parameter_sets`.
pub fn run_parallel_experiments(
    parameter_sets: &[ParameterSet],
    num_threads: Option<usize>,
) -> Result<Vec<SimulationResult>, ExperimentError> {
    run_parallel_experiments_with_progress(parameter_sets, num_threads, true)
}

/// Run multiple simulations in parallel, optionally showing progress.
///
/// # Errors
///
/// Fails if the thread pool cannot be built or any run is rejected.
pub fn run_parallel_experiments_with_progress(
    parameter_sets: &[ParameterSet],
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<SimulationResult>, ExperimentError> {
    let total = parameter_sets.len();
    let pb = (show_progress && total > 0).then(|| {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    });

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    let results = pool.install(|| {
        parameter_sets
            .par_iter()
            .map(|param_set| {
                let result = run_single_simulation(param_set);
                if let Some(progress_bar) = &pb {
                    progress_bar.inc(1);
                }
                result
            })
            .collect::<Result<Vec<_>, _>>()
    });

    if let Some(progress_bar) = &pb {
        progress_bar.finish_with_message("Completed");
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterSpace;
    use crowd_sim::config::PolicyKind;

    #[test]
    fn test_single_simulation() {
        let sets = ParameterSpace::grid().num_workers(vec![5]).num_tasks(vec![30]).generate();
        let result = run_single_simulation(&sets[0]).expect("run");
        assert_eq!(result.tasks_admitted, 30);
        assert_eq!(result.tasks_completed + result.tasks_expired, 30);
    }

    #[test]
    fn test_parallel_experiments_keep_input_order() {
        let sets = ParameterSpace::grid()
            .policies(vec![PolicyKind::Greedy, PolicyKind::composite(), PolicyKind::Hungarian])
            .num_tasks(vec![20, 40])
            .generate();
        let results = run_parallel_experiments_with_progress(&sets, Some(2), false).expect("sweep");

        assert_eq!(results.len(), 6);
        for (set, result) in sets.iter().zip(&results) {
            assert_eq!(result.tasks_admitted, set.input.num_tasks as u64);
            assert_eq!(result, &run_single_simulation(set).expect("rerun"));
        }
    }
}
