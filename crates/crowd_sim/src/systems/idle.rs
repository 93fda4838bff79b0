//! Idle-time bookkeeping for fairness-aware policies.

use bevy_ecs::prelude::{Query, Res};

use crate::config::SimConfig;
use crate::ecs::Worker;

/// Counts one more idle tick for every idle worker and refreshes its fairness
/// EWMA: `ewma = (1 - gamma) * idle_ticks + gamma * ewma`.
pub fn idle_tracking_system(config: Res<SimConfig>, mut workers: Query<&mut Worker>) {
    let gamma = config.fairness_gamma;
    for mut worker in workers.iter_mut() {
        if !worker.is_idle() {
            continue;
        }
        worker.idle_ticks += 1;
        worker.fairness_ewma = (1.0 - gamma) * worker.idle_ticks as f64 + gamma * worker.fairness_ewma;
    }
}
