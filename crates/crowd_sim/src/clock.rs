use bevy_ecs::prelude::Resource;

/// Logical simulation time. One tick is one discrete step of the loop.
pub type Tick = u64;

/// Logical clock for a single run. Not tied to wall-clock time; seconds per
/// tick only matter for reporting and live in the metrics collector.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct SimulationClock {
    now: Tick,
}

impl SimulationClock {
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Moves to the next tick. Called by the runner once every system for the
    /// current tick has been applied.
    pub fn advance(&mut self) -> Tick {
        self.now += 1;
        self.now
    }
}
