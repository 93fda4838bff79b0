//! Parameter variation framework for policy and supply/demand sweeps.
//!
//! A [`ParameterSpace`] holds a base configuration plus lists of values to
//! vary. [`ParameterSpace::generate`] expands the Cartesian product into
//! [`ParameterSet`]s, one per simulation run. Empty lists fall back to the
//! base value, so an empty space yields exactly one set.

use crowd_sim::config::{PolicyKind, SimConfig};
use crowd_sim::synthetic::SyntheticConfig;
use serde::Serialize;

/// One fully specified run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    pub experiment_id: String,
    pub run_id: usize,
    pub config: SimConfig,
    pub input: SyntheticConfig,
}

impl ParameterSet {
    pub fn seed(&self) -> u64 {
        self.input.seed
    }
}

#[derive(Debug, Clone)]
pub struct ParameterSpace {
    experiment_id: String,
    base_config: SimConfig,
    base_input: SyntheticConfig,
    speeds: Vec<f64>,
    pickup_radii: Vec<f64>,
    policies: Vec<PolicyKind>,
    num_workers: Vec<usize>,
    num_tasks: Vec<usize>,
    seeds: Vec<u64>,
}

impl ParameterSpace {
    /// Start a grid search from the default configuration.
    pub fn grid() -> Self {
        Self {
            experiment_id: "sweep".to_owned(),
            base_config: SimConfig::default(),
            base_input: SyntheticConfig::default(),
            speeds: Vec::new(),
            pickup_radii: Vec::new(),
            policies: Vec::new(),
            num_workers: Vec::new(),
            num_tasks: Vec::new(),
            seeds: Vec::new(),
        }
    }

    pub fn experiment_id(mut self, id: impl Into<String>) -> Self {
        self.experiment_id = id.into();
        self
    }

    pub fn base_config(mut self, config: SimConfig) -> Self {
        self.base_config = config;
        self
    }

    pub fn base_input(mut self, input: SyntheticConfig) -> Self {
        self.base_input = input;
        self
    }

    pub fn speeds(mut self, values: Vec<f64>) -> Self {
        self.speeds = values;
        self
    }

    pub fn pickup_radii(mut self, values: Vec<f64>) -> Self {
        self.pickup_radii = values;
        self
    }

    pub fn policies(mut self, values: Vec<PolicyKind>) -> Self {
        self.policies = values;
        self
    }

    pub fn num_workers(mut self, values: Vec<usize>) -> Self {
        self.num_workers = values;
        self
    }

    pub fn num_tasks(mut self, values: Vec<usize>) -> Self {
        self.num_tasks = values;
        self
    }

    pub fn seeds(mut self, values: Vec<u64>) -> Self {
        self.seeds = values;
        self
    }

    /// Expand the grid. Combinations whose configuration fails validation
    /// are dropped; run ids stay dense over the kept sets.
    pub fn generate(&self) -> Vec<ParameterSet> {
        let speeds = or_base(&self.speeds, self.base_config.speed);
        let radii = or_base(&self.pickup_radii, self.base_config.max_pickup_radius);
        let policies = or_base(&self.policies, self.base_config.policy.clone());
        let workers = or_base(&self.num_workers, self.base_input.num_workers);
        let tasks = or_base(&self.num_tasks, self.base_input.num_tasks);
        let seeds = or_base(&self.seeds, self.base_input.seed);

        let mut sets = Vec::new();
        for policy in &policies {
            for &speed in &speeds {
                for &radius in &radii {
                    for &num_workers in &workers {
                        for &num_tasks in &tasks {
                            for &seed in &seeds {
                                let config = self
                                    .base_config
                                    .clone()
                                    .with_policy(policy.clone())
                                    .with_speed(speed)
                                    .with_max_pickup_radius(radius);
                                if config.validate().is_err() {
                                    continue;
                                }
                                let input = self
                                    .base_input
                                    .clone()
                                    .with_workers(num_workers)
                                    .with_tasks(num_tasks)
                                    .with_seed(seed);
                                sets.push(ParameterSet {
                                    experiment_id: self.experiment_id.clone(),
                                    run_id: sets.len(),
                                    config,
                                    input,
                                });
                            }
                        }
                    }
                }
            }
        }
        sets
    }
}

fn or_base<T: Clone>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}
