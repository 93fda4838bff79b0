use std::collections::{BTreeMap, BTreeSet};

use bevy_ecs::prelude::{Component, Entity, Resource};
use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    EnRouteToPickup,
    EnRouteToDropoff,
}

#[derive(Debug, Clone, PartialEq, Component)]
pub struct Worker {
    pub id: WorkerId,
    pub state: WorkerState,
    pub release_time: Tick,
    /// Last tick the worker may stay in the system while idle.
    pub deadline: Option<Tick>,
    /// Distance covered per tick.
    pub speed: f64,
    /// Back-reference only; the bound [`Task`] is the authority on the pairing.
    pub assigned_task: Option<TaskId>,
    pub completed_tasks: u32,
    pub idle_ticks: u64,
    /// Exponentially smoothed idle time; higher means under-served.
    pub fairness_ewma: f64,
    pub distance_travelled: f64,
}

impl Worker {
    pub fn is_idle(&self) -> bool {
        self.state == WorkerState::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Assigned,
    PickedUp,
    Completed,
    Expired,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Expired)
    }

    /// Assigned or picked up: a worker is bound to the task.
    pub fn is_in_service(self) -> bool {
        matches!(self, TaskState::Assigned | TaskState::PickedUp)
    }
}

#[derive(Debug, Clone, PartialEq, Component)]
pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    pub pickup: Point,
    pub dropoff: Point,
    pub release_time: Tick,
    pub expiry_time: Tick,
    pub assigned_worker: Option<WorkerId>,
    pub assigned_at: Option<Tick>,
    pub picked_up_at: Option<Tick>,
    pub completed_at: Option<Tick>,
    /// Worker → pickup distance at the moment of assignment.
    pub pickup_distance: Option<f64>,
}

impl Task {
    /// Whether the task may be bound at `tick`.
    pub fn is_assignable_at(&self, tick: Tick) -> bool {
        self.state == TaskState::Pending && self.release_time <= tick && tick < self.expiry_time
    }
}

/// Current worker position. Tasks carry their positions on [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Point);

/// Registry of admitted, non-terminal entities keyed by their stable ids.
///
/// Ordered maps keep every iteration over the pool deterministic.
#[derive(Debug, Default, Resource)]
pub struct ActivePool {
    workers: BTreeMap<WorkerId, Entity>,
    tasks: BTreeMap<TaskId, Entity>,
    seen_workers: BTreeSet<WorkerId>,
    seen_tasks: BTreeSet<TaskId>,
}

impl ActivePool {
    /// Whether a worker with this id was ever admitted during the run.
    pub fn has_seen_worker(&self, id: WorkerId) -> bool {
        self.seen_workers.contains(&id)
    }

    pub fn has_seen_task(&self, id: TaskId) -> bool {
        self.seen_tasks.contains(&id)
    }

    pub fn insert_worker(&mut self, id: WorkerId, entity: Entity) {
        self.seen_workers.insert(id);
        self.workers.insert(id, entity);
    }

    pub fn insert_task(&mut self, id: TaskId, entity: Entity) {
        self.seen_tasks.insert(id);
        self.tasks.insert(id, entity);
    }

    pub fn remove_worker(&mut self, id: WorkerId) -> Option<Entity> {
        self.workers.remove(&id)
    }

    pub fn remove_task(&mut self, id: TaskId) -> Option<Entity> {
        self.tasks.remove(&id)
    }

    pub fn worker(&self, id: WorkerId) -> Option<Entity> {
        self.workers.get(&id).copied()
    }

    pub fn task(&self, id: TaskId) -> Option<Entity> {
        self.tasks.get(&id).copied()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn worker_ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.workers.keys().copied()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_remembers_removed_ids() {
        let mut pool = ActivePool::default();
        let entity = Entity::from_raw(7);
        pool.insert_task(TaskId(1), entity);
        assert_eq!(pool.task(TaskId(1)), Some(entity));

        assert_eq!(pool.remove_task(TaskId(1)), Some(entity));
        assert_eq!(pool.task(TaskId(1)), None);
        assert!(pool.has_seen_task(TaskId(1)));
        assert_eq!(pool.task_count(), 0);
    }

    #[test]
    fn assignable_window_is_half_open() {
        let task = Task {
            id: TaskId(1),
            state: TaskState::Pending,
            pickup: Point::new(0.0, 0.0),
            dropoff: Point::new(1.0, 0.0),
            release_time: 2,
            expiry_time: 5,
            assigned_worker: None,
            assigned_at: None,
            picked_up_at: None,
            completed_at: None,
            pickup_distance: None,
        };
        assert!(!task.is_assignable_at(1));
        assert!(task.is_assignable_at(2));
        assert!(task.is_assignable_at(4));
        assert!(!task.is_assignable_at(5));
    }
}
