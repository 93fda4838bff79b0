//! Spatial index: bucketed id → position lookups for proximity queries.
//!
//! This module provides:
//!
//! - **Bucketing**: uniform square grid for planar coordinates, or H3 cells for
//!   geographic coordinates
//! - **SpatialIndex**: separate bucket maps for workers and tasks, updated
//!   incrementally as entities are admitted, move, or leave the pool
//! - **Nearby queries**: ids within a radius of a point, ordered by distance
//!
//! The index owns no entities. It is a derived structure that can be cleared
//! and rebuilt from the ECS world at any time.

use std::collections::HashMap;
use std::hash::Hash;

use bevy_ecs::prelude::Resource;
use h3o::{CellIndex, LatLng, Resolution};

use crate::ecs::{TaskId, WorkerId};
use crate::geometry::{DistanceMetric, Point};

/// Bucket key for one index cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BucketKey {
    Grid(i64, i64),
    Cell(CellIndex),
    /// Positions that cannot be placed in an H3 cell. Always scanned.
    Unplaced,
}

/// How positions are grouped into buckets.
#[derive(Debug, Clone, Copy)]
pub enum Bucketing {
    /// Square cells of `cell_size` coordinate units.
    Grid { cell_size: f64 },
    /// H3 cells at the given resolution; radii are in kilometres.
    H3 { resolution: Resolution },
}

impl Bucketing {
    fn key(&self, point: Point) -> BucketKey {
        match *self {
            Bucketing::Grid { cell_size } => {
                BucketKey::Grid(grid_coord(point.lat, cell_size), grid_coord(point.lon, cell_size))
            }
            Bucketing::H3 { resolution } => match LatLng::new(point.lat, point.lon) {
                Ok(ll) => BucketKey::Cell(ll.to_cell(resolution)),
                Err(_) => BucketKey::Unplaced,
            },
        }
    }

    /// Every bucket that may contain a point within `radius` of `center`, or
    /// `None` when that neighbourhood has more than `limit` buckets.
    fn neighborhood(&self, center: Point, radius: f64, limit: usize) -> Option<Vec<BucketKey>> {
        let mut keys = match *self {
            Bucketing::Grid { cell_size } => {
                let span = (radius / cell_size).ceil().max(0.0);
                let side = 2.0 * span + 1.0;
                if side * side > limit as f64 {
                    return None;
                }
                let span = span as i64;
                let (row, col) = (grid_coord(center.lat, cell_size), grid_coord(center.lon, cell_size));
                let mut keys = Vec::with_capacity((side * side) as usize + 1);
                for dr in -span..=span {
                    for dc in -span..=span {
                        keys.push(BucketKey::Grid(row.saturating_add(dr), col.saturating_add(dc)));
                    }
                }
                keys
            }
            Bucketing::H3 { resolution } => match LatLng::new(center.lat, center.lon) {
                Ok(ll) => {
                    // Adjacent cell centres are ~1.7 edge lengths apart; one ring
                    // per edge length plus one overshoots the radius.
                    let k = (radius / resolution.edge_length_km()).ceil().max(0.0) + 1.0;
                    // A disk of k rings holds 3k(k+1)+1 cells.
                    if 3.0 * k * (k + 1.0) + 1.0 > limit as f64 {
                        return None;
                    }
                    ll.to_cell(resolution)
                        .grid_disk::<Vec<_>>(k as u32)
                        .into_iter()
                        .map(BucketKey::Cell)
                        .collect()
                }
                Err(_) => Vec::new(),
            },
        };
        keys.push(BucketKey::Unplaced);
        Some(keys)
    }
}

fn grid_coord(value: f64, cell_size: f64) -> i64 {
    (value / cell_size).floor() as i64
}

/// One result of a nearby query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<K> {
    pub id: K,
    pub position: Point,
    pub distance: f64,
}

/// Bucket → ids plus the reverse id → (bucket, position) mapping.
#[derive(Debug)]
struct BucketMap<K> {
    by_bucket: HashMap<BucketKey, Vec<K>>,
    entries: HashMap<K, (BucketKey, Point)>,
}

impl<K> Default for BucketMap<K> {
    fn default() -> Self {
        Self {
            by_bucket: HashMap::new(),
            entries: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + Ord> BucketMap<K> {
    fn insert(&mut self, bucketing: &Bucketing, id: K, position: Point) {
        let key = bucketing.key(position);
        match self.entries.insert(id, (key, position)) {
            Some((old_key, _)) if old_key == key => return,
            Some((old_key, _)) => self.detach(old_key, id),
            None => {}
        }
        self.by_bucket.entry(key).or_default().push(id);
    }

    fn remove(&mut self, id: K) -> bool {
        match self.entries.remove(&id) {
            Some((key, _)) => {
                self.detach(key, id);
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, key: BucketKey, id: K) {
        if let Some(ids) = self.by_bucket.get_mut(&key) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.by_bucket.remove(&key);
            }
        }
    }

    fn position(&self, id: K) -> Option<Point> {
        self.entries.get(&id).map(|(_, position)| *position)
    }

    fn query(
        &self,
        bucketing: &Bucketing,
        metric: DistanceMetric,
        center: Point,
        radius: f64,
    ) -> Vec<Neighbor<K>> {
        // Past the occupied bucket count, probing keys costs more than a scan.
        let candidates: Vec<&K> = match bucketing.neighborhood(center, radius, self.by_bucket.len()) {
            Some(keys) => keys
                .iter()
                .filter_map(|key| self.by_bucket.get(key))
                .flatten()
                .collect(),
            None => self.by_bucket.values().flatten().collect(),
        };
        let mut found: Vec<Neighbor<K>> = candidates
            .into_iter()
            .filter_map(|&id| {
                let (_, position) = self.entries.get(&id)?;
                let distance = metric.distance(center, *position);
                (distance <= radius).then_some(Neighbor {
                    id,
                    position: *position,
                    distance,
                })
            })
            .collect();
        found.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        found
    }

    fn clear(&mut self) {
        self.by_bucket.clear();
        self.entries.clear();
    }
}

/// Spatial index for worker and task lookups by position.
///
/// Workers are tracked at their current position; tasks at their pickup point
/// while they are pending. Queries only return ids within the radius under the
/// configured metric, nearest first, ties broken by lower id.
#[derive(Debug, Resource)]
pub struct SpatialIndex {
    bucketing: Bucketing,
    metric: DistanceMetric,
    workers: BucketMap<WorkerId>,
    tasks: BucketMap<TaskId>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(Bucketing::Grid { cell_size: 1.0 }, DistanceMetric::Euclidean)
    }
}

impl SpatialIndex {
    pub fn new(bucketing: Bucketing, metric: DistanceMetric) -> Self {
        Self {
            bucketing,
            metric,
            workers: BucketMap::default(),
            tasks: BucketMap::default(),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Insert or move a worker.
    pub fn insert_worker(&mut self, id: WorkerId, position: Point) {
        self.workers.insert(&self.bucketing, id, position);
    }

    /// Insert or move a task's pickup point.
    pub fn insert_task(&mut self, id: TaskId, position: Point) {
        self.tasks.insert(&self.bucketing, id, position);
    }

    pub fn remove_worker(&mut self, id: WorkerId) -> bool {
        self.workers.remove(id)
    }

    pub fn remove_task(&mut self, id: TaskId) -> bool {
        self.tasks.remove(id)
    }

    pub fn worker_position(&self, id: WorkerId) -> Option<Point> {
        self.workers.position(id)
    }

    pub fn task_position(&self, id: TaskId) -> Option<Point> {
        self.tasks.position(id)
    }

    pub fn contains_worker(&self, id: WorkerId) -> bool {
        self.workers.entries.contains_key(&id)
    }

    pub fn contains_task(&self, id: TaskId) -> bool {
        self.tasks.entries.contains_key(&id)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.entries.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.entries.len()
    }

    /// Workers within `radius` of `center`, nearest first.
    pub fn workers_nearby(&self, center: Point, radius: f64) -> Vec<Neighbor<WorkerId>> {
        self.workers.query(&self.bucketing, self.metric, center, radius)
    }

    /// Tasks within `radius` of `center`, nearest first.
    pub fn tasks_nearby(&self, center: Point, radius: f64) -> Vec<Neighbor<TaskId>> {
        self.tasks.query(&self.bucketing, self.metric, center, radius)
    }

    /// Clear all entries (for rebuilds).
    pub fn clear(&mut self) {
        self.workers.clear();
        self.tasks.clear();
    }
}
