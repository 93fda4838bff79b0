//! Run configuration.
//!
//! [`SimConfig`] is consumed, not owned, by the core: loaders build it (or
//! deserialize it) and hand it to [`crate::runner::Simulation::new`], which
//! validates it before any tick runs.

use bevy_ecs::prelude::Resource;
use h3o::Resolution;
use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::error::ConfigError;
use crate::geometry::DistanceMetric;
use crate::spatial::Bucketing;

/// Default seconds per tick for reporting (ride-hailing logs use 3 s steps).
const DEFAULT_TICK_UNIT_SECS: f64 = 3.0;

/// When the loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Horizon {
    /// Run `limit` ticks (0..limit). Without `hard_stop`, keep going past the
    /// limit until every task is resolved.
    Ticks {
        limit: Tick,
        #[serde(default)]
        hard_stop: bool,
    },
    /// Run until the input is exhausted and every task is resolved.
    UntilDrained,
}

impl Default for Horizon {
    fn default() -> Self {
        Horizon::UntilDrained
    }
}

impl Horizon {
    /// Whether termination depends on the input being drained.
    pub fn waits_for_drain(&self) -> bool {
        !matches!(self, Horizon::Ticks { hard_stop: true, .. })
    }
}

/// Assignment policy selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum PolicyKind {
    /// Nearest feasible pair first.
    #[default]
    Greedy,
    /// Fairness / starvation / distance weighted score per task.
    Composite {
        #[serde(default = "default_weight")]
        fairness_weight: f64,
        #[serde(default = "default_weight")]
        starvation_weight: f64,
        #[serde(default = "default_distance_weight")]
        distance_weight: f64,
        /// Pairs scoring below this are deferred to a later tick.
        #[serde(default)]
        min_score: Option<f64>,
    },
    /// Minimum total pickup distance over all feasible pairs.
    Hungarian,
}

fn default_weight() -> f64 {
    1.0
}

fn default_distance_weight() -> f64 {
    0.5
}

impl PolicyKind {
    pub fn composite() -> Self {
        PolicyKind::Composite {
            fairness_weight: default_weight(),
            starvation_weight: default_weight(),
            distance_weight: default_distance_weight(),
            min_score: None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PolicyKind::Greedy => "greedy",
            PolicyKind::Composite { .. } => "composite",
            PolicyKind::Hungarian => "hungarian",
        }
    }
}

/// Parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SimConfig {
    pub horizon: Horizon,
    /// Default worker speed, distance units per tick.
    pub speed: f64,
    /// Feasibility cutoff on worker → pickup distance.
    pub max_pickup_radius: f64,
    /// Seconds represented by one tick (reporting only).
    pub tick_unit_secs: f64,
    pub distance_metric: DistanceMetric,
    /// Bucket edge for the planar grid index (Euclidean metric).
    pub grid_cell_size: f64,
    /// H3 resolution for the geographic index (Haversine / Manhattan).
    pub h3_resolution: u8,
    pub policy: PolicyKind,
    /// EWMA smoothing factor for per-worker idle-time fairness.
    pub fairness_gamma: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            horizon: Horizon::default(),
            speed: 1.0,
            max_pickup_radius: 5.0,
            tick_unit_secs: DEFAULT_TICK_UNIT_SECS,
            distance_metric: DistanceMetric::default(),
            grid_cell_size: 1.0,
            h3_resolution: 9,
            policy: PolicyKind::default(),
            fairness_gamma: 0.3,
        }
    }
}

impl SimConfig {
    pub fn with_horizon(mut self, horizon: Horizon) -> Self {
        self.horizon = horizon;
        self
    }

    /// Shorthand for a hard-stop horizon of `limit` ticks.
    pub fn with_tick_limit(mut self, limit: Tick) -> Self {
        self.horizon = Horizon::Ticks {
            limit,
            hard_stop: true,
        };
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_max_pickup_radius(mut self, radius: f64) -> Self {
        self.max_pickup_radius = radius;
        self
    }

    pub fn with_tick_unit_secs(mut self, secs: f64) -> Self {
        self.tick_unit_secs = secs;
        self
    }

    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    pub fn with_grid_cell_size(mut self, size: f64) -> Self {
        self.grid_cell_size = size;
        self
    }

    pub fn with_h3_resolution(mut self, resolution: u8) -> Self {
        self.h3_resolution = resolution;
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Checks every option that can be judged without the input stream.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if !self.max_pickup_radius.is_finite() || self.max_pickup_radius < 0.0 {
            return Err(ConfigError::InvalidPickupRadius(self.max_pickup_radius));
        }
        if !self.tick_unit_secs.is_finite() || self.tick_unit_secs <= 0.0 {
            return Err(ConfigError::InvalidTickUnit(self.tick_unit_secs));
        }
        if !(0.0..=1.0).contains(&self.fairness_gamma) {
            return Err(ConfigError::InvalidFairnessGamma(self.fairness_gamma));
        }
        if let PolicyKind::Composite {
            fairness_weight,
            starvation_weight,
            distance_weight,
            min_score,
        } = &self.policy
        {
            let weights = [*fairness_weight, *starvation_weight, *distance_weight];
            if weights.iter().any(|w| !w.is_finite()) || min_score.is_some_and(|s| s.is_nan()) {
                return Err(ConfigError::InvalidPolicy {
                    reason: "composite weights must be finite numbers".to_owned(),
                });
            }
        }
        self.bucketing().map(|_| ())
    }

    /// Index bucketing implied by the distance metric.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a non-positive grid cell size or an
    /// out-of-range H3 resolution.
    pub fn bucketing(&self) -> Result<Bucketing, ConfigError> {
        if self.distance_metric.is_geographic() {
            let resolution = Resolution::try_from(self.h3_resolution)
                .map_err(|_| ConfigError::InvalidH3Resolution(self.h3_resolution))?;
            Ok(Bucketing::H3 { resolution })
        } else if self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0 {
            Ok(Bucketing::Grid {
                cell_size: self.grid_cell_size,
            })
        } else {
            Err(ConfigError::InvalidGridCellSize(self.grid_cell_size))
        }
    }
}
