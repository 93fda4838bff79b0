//! Simulation runner: owns the ECS world and drives it one tick at a time.
//!
//! Every tick runs the full schedule once (admission, eviction, index sync,
//! matching, movement, completion, idle bookkeeping, metrics), then clears
//! change trackers and advances the clock. Each [`Simulation`] owns its own
//! [`World`], so independent runs can execute side by side.

use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, ExecutorKind, IntoSystemConfigs};
use tracing::{debug, info};

use crate::clock::{SimulationClock, Tick};
use crate::config::{Horizon, SimConfig};
use crate::ecs::{ActivePool, Position, Task, TaskId, Worker, WorkerId};
use crate::error::ConfigError;
use crate::geometry::Point;
use crate::input::{InputRecord, PendingInput};
use crate::matching::{build_policy, AssignmentPolicy, AssignmentPolicyResource};
use crate::metrics::{MetricsCollector, RunSummary, TickRecord};
use crate::movement::MovementEvents;
use crate::spatial::SpatialIndex;
use crate::systems::{
    admission::admission_system, completion::completion_system, eviction::eviction_system,
    idle::idle_tracking_system, matching::matching_system, metrics::metrics_system,
    movement::movement_system, spatial_index::sync_spatial_index_system,
};

/// Builds the per-tick schedule. Systems run strictly in order on one thread;
/// [apply_deferred] points make spawns and despawns visible to later stages.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            admission_system,
            apply_deferred,
            eviction_system,
            apply_deferred,
            sync_spatial_index_system,
            matching_system,
            movement_system,
            completion_system,
            idle_tracking_system,
            apply_deferred,
            metrics_system,
        )
            .chain(),
    );
    schedule
}

/// One simulation run.
pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    /// Validates `config` and builds a run using the configured policy.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let policy = build_policy(&config.policy);
        Self::with_policy(config, policy)
    }

    /// Like [`Simulation::new`] but with a caller-supplied policy.
    pub fn with_policy(
        config: SimConfig,
        policy: Box<dyn AssignmentPolicy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let bucketing = config.bucketing()?;

        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        world.insert_resource(SpatialIndex::new(bucketing, config.distance_metric));
        world.insert_resource(ActivePool::default());
        world.insert_resource(PendingInput::default());
        world.insert_resource(MovementEvents::default());
        world.insert_resource(MetricsCollector::new(config.tick_unit_secs));
        world.insert_resource(AssignmentPolicyResource::new(policy));
        world.insert_resource(config);

        Ok(Self {
            world,
            schedule: simulation_schedule(),
        })
    }

    /// Queue one input record. Returns `false` if the stream was already
    /// closed; the record is then counted as a data error on the next tick.
    pub fn push(&mut self, record: InputRecord) -> bool {
        self.world.resource_mut::<PendingInput>().push(record)
    }

    /// Queue every record from `records`.
    pub fn ingest<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = InputRecord>,
    {
        let mut input = self.world.resource_mut::<PendingInput>();
        for record in records {
            input.push(record);
        }
    }

    pub fn now(&self) -> Tick {
        self.world.resource::<SimulationClock>().now()
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn policy_name(&self) -> &'static str {
        self.world.resource::<AssignmentPolicyResource>().name()
    }

    /// End of stream seen, nothing queued that could still become a task, and
    /// no open tasks. Workers never keep a run alive.
    pub fn is_drained(&self) -> bool {
        let input = self.world.resource::<PendingInput>();
        input.is_closed()
            && input.queued_tasks() == 0
            && self.world.resource::<ActivePool>().task_count() == 0
    }

    /// Whether the configured horizon has been reached.
    pub fn is_finished(&self) -> bool {
        match self.config().horizon {
            Horizon::Ticks {
                limit,
                hard_stop: true,
            } => self.now() >= limit,
            Horizon::Ticks {
                limit,
                hard_stop: false,
            } => self.now() >= limit && self.is_drained(),
            Horizon::UntilDrained => self.is_drained(),
        }
    }

    /// Checks the configuration against the ingested stream.
    pub fn check_ready(&self) -> Result<(), ConfigError> {
        let horizon = self.config().horizon;
        let input = self.world.resource::<PendingInput>();
        if horizon.waits_for_drain() && !input.is_closed() {
            return Err(ConfigError::UnterminatedInput);
        }
        if let Horizon::Ticks {
            limit,
            hard_stop: true,
        } = horizon
        {
            if let Some(earliest_release) = input.next_release() {
                if self.now() == 0 && earliest_release >= limit {
                    return Err(ConfigError::HorizonBeforeRelease {
                        horizon: limit,
                        earliest_release,
                    });
                }
            }
        }
        Ok(())
    }

    /// Runs one tick, or returns `None` once the horizon has been reached.
    pub fn step(&mut self) -> Option<TickRecord> {
        if self.is_finished() {
            return None;
        }
        self.schedule.run(&mut self.world);
        self.world.clear_trackers();
        let tick = self.world.resource_mut::<SimulationClock>().advance();
        debug!(tick, "clock advanced");
        self.metrics().last_record().cloned()
    }

    /// Runs until the horizon is reached.
    pub fn run(&mut self) -> Result<RunSummary, ConfigError> {
        self.run_until(|_| false)
    }

    /// Runs until the horizon is reached or `stop` returns `true` for a
    /// closed tick. The summary covers every tick run so far.
    pub fn run_until<F>(&mut self, mut stop: F) -> Result<RunSummary, ConfigError>
    where
        F: FnMut(&TickRecord) -> bool,
    {
        self.check_ready()?;
        info!(
            policy = self.policy_name(),
            horizon = ?self.config().horizon,
            start_tick = self.now(),
            "simulation started"
        );
        while let Some(record) = self.step() {
            if stop(&record) {
                break;
            }
        }
        let summary = self.summary();
        info!(
            ticks = summary.ticks,
            tasks_admitted = summary.tasks_admitted,
            tasks_completed = summary.tasks_completed,
            tasks_expired = summary.tasks_expired,
            tasks_open = summary.tasks_open,
            completion_rate = summary.completion_rate,
            "simulation stopped"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        self.metrics().summary()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        self.world.resource::<MetricsCollector>()
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        self.world.resource::<SpatialIndex>()
    }

    /// An active worker, if it has been admitted and not yet evicted.
    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        let entity = self.world.resource::<ActivePool>().worker(id)?;
        self.world.get::<Worker>(entity)
    }

    pub fn worker_position(&self, id: WorkerId) -> Option<Point> {
        let entity = self.world.resource::<ActivePool>().worker(id)?;
        self.world.get::<Position>(entity).map(|p| p.0)
    }

    /// An open task. Completed and expired tasks only survive in metrics.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        let entity = self.world.resource::<ActivePool>().task(id)?;
        self.world.get::<Task>(entity)
    }

    /// Active workers in id order.
    pub fn workers(&self) -> Vec<&Worker> {
        let pool = self.world.resource::<ActivePool>();
        pool.worker_ids()
            .filter_map(|id| pool.worker(id))
            .filter_map(|entity| self.world.get::<Worker>(entity))
            .collect()
    }

    /// Open tasks in id order.
    pub fn tasks(&self) -> Vec<&Task> {
        let pool = self.world.resource::<ActivePool>();
        pool.task_ids()
            .filter_map(|id| pool.task(id))
            .filter_map(|entity| self.world.get::<Task>(entity))
            .collect()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::input::{TaskRecord, WorkerRecord};

    fn worker(id: u64, lat: f64, lon: f64) -> InputRecord {
        InputRecord::Worker(WorkerRecord {
            id: WorkerId(id),
            position: Point::new(lat, lon),
            release_time: 0,
            deadline: None,
            speed: None,
        })
    }

    fn task(id: u64, release_time: Tick, expiry_time: Tick) -> InputRecord {
        InputRecord::Task(TaskRecord {
            id: TaskId(id),
            pickup: Point::new(0.0, 0.0),
            dropoff: Point::new(1.0, 0.0),
            release_time,
            expiry_time,
        })
    }

    #[test]
    fn invalid_config_is_rejected_before_any_tick() {
        let result = Simulation::new(SimConfig::default().with_speed(-1.0));
        assert!(matches!(result, Err(ConfigError::InvalidSpeed(_))));
    }

    #[test]
    fn drain_requires_end_of_stream() {
        let mut sim = Simulation::new(SimConfig::default()).expect("sim");
        sim.ingest([worker(1, 0.0, 0.0), task(1, 0, 5)]);
        assert_eq!(sim.run(), Err(ConfigError::UnterminatedInput));
        assert_eq!(sim.now(), 0);
    }

    #[test]
    fn hard_horizon_before_first_release_is_rejected() {
        let mut sim = Simulation::new(SimConfig::default().with_tick_limit(3)).expect("sim");
        sim.ingest([task(1, 5, 9)]);
        assert_eq!(
            sim.run(),
            Err(ConfigError::HorizonBeforeRelease {
                horizon: 3,
                earliest_release: 5
            })
        );
    }

    #[test]
    fn hard_horizon_stops_on_time_with_open_tasks() {
        let mut sim = Simulation::new(SimConfig::default().with_tick_limit(2)).expect("sim");
        sim.ingest([task(1, 0, 100)]);
        let summary = sim.run().expect("run");
        assert_eq!(summary.ticks, 2);
        assert_eq!(sim.now(), 2);
        assert_eq!(summary.tasks_open, 1);
        assert!(summary.is_conserved());
        assert!(sim.step().is_none());
    }

    #[test]
    fn run_until_stops_at_a_tick_boundary() {
        let mut sim = Simulation::new(SimConfig::default()).expect("sim");
        sim.ingest([task(1, 0, 50), InputRecord::EndOfStream]);
        let summary = sim.run_until(|record| record.tick == 4).expect("run");
        assert_eq!(summary.ticks, 5);
        assert_eq!(sim.now(), 5);

        // Resuming finishes the run.
        let summary = sim.run().expect("resume");
        assert_eq!(summary.tasks_expired, 1);
        assert_eq!(sim.now(), 51);
        assert!(sim.is_finished());
    }
}
