//! Run a synthetic 20 workers / 200 tasks scenario under each policy and print
//! the summaries side by side.
//!
//! Run with: RUST_LOG=info cargo run -p crowd_sim --example scenario_run

use crowd_sim::config::{PolicyKind, SimConfig};
use crowd_sim::synthetic::{SyntheticConfig, SyntheticStream};
use crowd_sim::Simulation;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    const NUM_WORKERS: usize = 20;
    const NUM_TASKS: usize = 200;

    let input = SyntheticConfig::default()
        .with_seed(123)
        .with_workers(NUM_WORKERS)
        .with_tasks(NUM_TASKS)
        .with_task_release_window(100)
        .with_task_lifetime(5, 25);

    println!("--- Scenario run ({NUM_WORKERS} workers, {NUM_TASKS} tasks, seed 123) ---");
    println!(
        "{:<10} {:>6} {:>9} {:>7} {:>10} {:>9} {:>7}",
        "policy", "ticks", "completed", "expired", "rate", "wait(s)", "JFI"
    );

    for policy in [PolicyKind::Greedy, PolicyKind::composite(), PolicyKind::Hungarian] {
        let label = policy.label();
        let config = SimConfig::default()
            .with_max_pickup_radius(4.0)
            .with_policy(policy);
        let mut sim = match Simulation::new(config) {
            Ok(sim) => sim,
            Err(err) => {
                eprintln!("{label}: invalid configuration: {err}");
                continue;
            }
        };
        sim.ingest(SyntheticStream::new(&input));
        match sim.run() {
            Ok(summary) => println!(
                "{:<10} {:>6} {:>9} {:>7} {:>10.3} {:>9.1} {:>7.3}",
                label,
                summary.ticks,
                summary.tasks_completed,
                summary.tasks_expired,
                summary.completion_rate,
                summary.mean_wait_secs,
                summary.jain_fairness,
            ),
            Err(err) => eprintln!("{label}: run rejected: {err}"),
        }
    }
}
