//! Parallel experimentation framework for crowdsourcing simulation sweeps.
//!
//! Runs many independent simulations over a parameter grid (policy, speed,
//! pickup radius, supply, demand, seed), extracts metrics and exports them.
//!
//! # Quick Start
//!
//! ```no_run
//! use crowd_experiments::{export_results_csv, run_parallel_experiments, ParameterSpace};
//! use crowd_sim::config::PolicyKind;
//!
//! let sets = ParameterSpace::grid()
//!     .policies(vec![PolicyKind::Greedy, PolicyKind::Hungarian])
//!     .num_workers(vec![10, 20])
//!     .seeds(vec![1, 2, 3])
//!     .generate();
//!
//! let results = run_parallel_experiments(&sets, None)?;
//! export_results_csv(&results, &sets, "sweep.csv")?;
//! # Ok::<(), crowd_experiments::ExperimentError>(())
//! ```
//!
//! - [`parameters`]: grid expansion into [`ParameterSet`]s
//! - [`runner`]: parallel execution on a rayon pool
//! - [`metrics`]: per-run [`SimulationResult`]
//! - [`export`]: CSV/JSON results and the per-tick [`CsvMetricsSink`]

pub mod error;
pub mod export;
pub mod metrics;
pub mod parameters;
pub mod runner;

pub use error::ExperimentError;
pub use export::{export_results_csv, export_results_json, CsvMetricsSink};
pub use metrics::SimulationResult;
pub use parameters::{ParameterSet, ParameterSpace};
pub use runner::{run_parallel_experiments, run_parallel_experiments_with_progress, run_single_simulation};
