//! Example: compare assignment policies across supply levels and seeds.
//!
//! Run with: cargo run -p crowd_experiments --example parameter_sweep

use crowd_experiments::{export_results_csv, run_parallel_experiments, ParameterSpace};
use crowd_sim::config::{PolicyKind, SimConfig};
use crowd_sim::synthetic::SyntheticConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting parameter sweep experiment...");

    let space = ParameterSpace::grid()
        .experiment_id("policy-vs-supply")
        .base_config(SimConfig::default().with_max_pickup_radius(3.0))
        .base_input(
            SyntheticConfig::default()
                .with_tasks(300)
                .with_task_release_window(150)
                .with_task_lifetime(5, 25),
        )
        .policies(vec![PolicyKind::Greedy, PolicyKind::composite(), PolicyKind::Hungarian])
        .num_workers(vec![10, 20, 40])
        .seeds(vec![1, 2, 3, 4]);

    let parameter_sets = space.generate();
    println!("Generated {} parameter combinations", parameter_sets.len());

    let results = run_parallel_experiments(&parameter_sets, None)?;
    println!("Completed {} simulations", results.len());

    println!("\n{:<10} {:>8} {:>10} {:>9} {:>7}", "policy", "workers", "completion", "p90 wait", "JFI");
    for (params, result) in parameter_sets.iter().zip(&results) {
        if params.seed() != 1 {
            continue;
        }
        println!(
            "{:<10} {:>8} {:>10.3} {:>9.1} {:>7.3}",
            params.config.policy.label(),
            params.input.num_workers,
            result.completion_rate,
            result.p90_wait_ticks,
            result.jain_fairness,
        );
    }

    export_results_csv(&results, &parameter_sets, "experiment_results.csv")?;
    println!("\nExported to experiment_results.csv");

    Ok(())
}
