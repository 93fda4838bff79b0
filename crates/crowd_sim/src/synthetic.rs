//! Seeded synthetic input source.
//!
//! Produces a release-ordered stream of worker and task records inside a
//! bounding box, terminated by [`InputRecord::EndOfStream`]. The same
//! [`SyntheticConfig`] always yields the same stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::ecs::{TaskId, WorkerId};
use crate::geometry::Point;
use crate::input::{InputRecord, TaskRecord, WorkerRecord};

/// Axis-aligned area records are sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Point {
        Point::new(
            sample_between(rng, self.min.lat, self.max.lat),
            sample_between(rng, self.min.lon, self.max.lon),
        )
    }
}

impl Default for BoundingBox {
    /// A 10 x 10 planar grid anchored at the origin.
    fn default() -> Self {
        Self::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub num_workers: usize,
    pub num_tasks: usize,
    pub area: BoundingBox,
    /// Workers are released uniformly in `[0, worker_release_window]`.
    pub worker_release_window: Tick,
    /// Tasks are released uniformly in `[0, task_release_window]`.
    pub task_release_window: Tick,
    /// Validity window length, sampled uniformly from this inclusive range.
    pub task_lifetime: (Tick, Tick),
    /// Optional shift length; each worker's deadline is release + shift.
    pub worker_shift: Option<Tick>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_workers: 20,
            num_tasks: 100,
            area: BoundingBox::default(),
            worker_release_window: 0,
            task_release_window: 50,
            task_lifetime: (10, 30),
            worker_shift: None,
        }
    }
}

impl SyntheticConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_tasks(mut self, num_tasks: usize) -> Self {
        self.num_tasks = num_tasks;
        self
    }

    pub fn with_area(mut self, area: BoundingBox) -> Self {
        self.area = area;
        self
    }

    pub fn with_task_release_window(mut self, window: Tick) -> Self {
        self.task_release_window = window;
        self
    }

    pub fn with_task_lifetime(mut self, min: Tick, max: Tick) -> Self {
        self.task_lifetime = (min, max);
        self
    }

    pub fn with_worker_shift(mut self, shift: Tick) -> Self {
        self.worker_shift = Some(shift);
        self
    }
}

/// Iterator over a generated stream. Records come out sorted by release
/// time (workers before tasks on ties), then the end-of-stream marker.
#[derive(Debug)]
pub struct SyntheticStream {
    records: std::vec::IntoIter<InputRecord>,
}

impl SyntheticStream {
    pub fn new(config: &SyntheticConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut records = Vec::with_capacity(config.num_workers + config.num_tasks + 1);

        for i in 0..config.num_workers {
            let release_time = rng.gen_range(0..=config.worker_release_window);
            records.push(InputRecord::Worker(WorkerRecord {
                id: WorkerId(i as u64 + 1),
                position: config.area.sample(&mut rng),
                release_time,
                deadline: config.worker_shift.map(|shift| release_time + shift),
                speed: None,
            }));
        }

        let (min_life, max_life) = config.task_lifetime;
        let min_life = min_life.max(1);
        let max_life = max_life.max(min_life);
        for i in 0..config.num_tasks {
            let release_time = rng.gen_range(0..=config.task_release_window);
            records.push(InputRecord::Task(TaskRecord {
                id: TaskId(i as u64 + 1),
                pickup: config.area.sample(&mut rng),
                dropoff: config.area.sample(&mut rng),
                release_time,
                expiry_time: release_time + rng.gen_range(min_life..=max_life),
            }));
        }

        // Stable sort keeps id order within a release tick.
        records.sort_by_key(|record| match record {
            InputRecord::Worker(w) => (w.release_time, 0),
            InputRecord::Task(t) => (t.release_time, 1),
            InputRecord::EndOfStream => (Tick::MAX, 2),
        });
        records.push(InputRecord::EndOfStream);

        Self {
            records: records.into_iter(),
        }
    }
}

impl Iterator for SyntheticStream {
    type Item = InputRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for SyntheticStream {}

fn sample_between<R: Rng>(rng: &mut R, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo == hi {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}
