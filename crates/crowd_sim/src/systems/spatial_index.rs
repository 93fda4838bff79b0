//! Spatial index update system: keeps id → position buckets in sync with the
//! ECS world.
//!
//! Workers are indexed at their current [`Position`]; tasks at their pickup
//! while they are pending. Despawned entities are removed through
//! [`RemovedComponents`], using a local entity → id map since the index itself
//! is keyed by stable ids.

use std::collections::HashMap;

use bevy_ecs::prelude::{Changed, Entity, Local, Query, RemovedComponents, ResMut};

use crate::ecs::{Position, Task, TaskId, TaskState, Worker, WorkerId};
use crate::spatial::SpatialIndex;

pub fn sync_spatial_index_system(
    mut spatial_index: ResMut<SpatialIndex>,
    moved_workers: Query<(Entity, &Worker, &Position), Changed<Position>>,
    changed_tasks: Query<(Entity, &Task), Changed<Task>>,
    mut removed_workers: RemovedComponents<Worker>,
    mut removed_tasks: RemovedComponents<Task>,
    mut indexed_workers: Local<HashMap<Entity, WorkerId>>,
    mut indexed_tasks: Local<HashMap<Entity, TaskId>>,
) {
    // Removals first: a despawned entity never shows up in the change queries.
    for entity in removed_workers.read() {
        if let Some(id) = indexed_workers.remove(&entity) {
            spatial_index.remove_worker(id);
        }
    }
    for entity in removed_tasks.read() {
        if let Some(id) = indexed_tasks.remove(&entity) {
            spatial_index.remove_task(id);
        }
    }

    // Changed includes newly added components.
    for (entity, worker, position) in moved_workers.iter() {
        spatial_index.insert_worker(worker.id, position.0);
        indexed_workers.insert(entity, worker.id);
    }

    for (entity, task) in changed_tasks.iter() {
        if task.state == TaskState::Pending {
            spatial_index.insert_task(task.id, task.pickup);
            indexed_tasks.insert(entity, task.id);
        } else {
            spatial_index.remove_task(task.id);
            indexed_tasks.remove(&entity);
        }
    }
}
