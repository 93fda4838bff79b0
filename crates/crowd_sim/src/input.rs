//! Input stream: typed worker/task records waiting for their release tick.
//!
//! Producers (trip-log adapters, check-in adapters, [`crate::synthetic`]) hand
//! the core a sequence of [`InputRecord`]s terminated by
//! [`InputRecord::EndOfStream`]. Records do not need to arrive sorted: the
//! [`PendingInput`] queue orders them by release time, then arrival order.
//! Validation happens at admission, not here.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::ecs::{TaskId, WorkerId};
use crate::error::DataError;
use crate::geometry::{DistanceMetric, Point};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub position: Point,
    pub release_time: Tick,
    #[serde(default)]
    pub deadline: Option<Tick>,
    /// Overrides the configured speed for this worker.
    #[serde(default)]
    pub speed: Option<f64>,
}

impl WorkerRecord {
    pub fn validate(&self, metric: DistanceMetric) -> Result<(), DataError> {
        if !metric.accepts(self.position) {
            return Err(DataError::invalid_coordinate(
                format!("worker {}", self.id),
                self.position,
            ));
        }
        if let Some(deadline) = self.deadline {
            if deadline < self.release_time {
                return Err(DataError::DeadlineBeforeRelease {
                    worker: self.id,
                    release_time: self.release_time,
                    deadline,
                });
            }
        }
        if let Some(speed) = self.speed {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(DataError::InvalidSpeed {
                    worker: self.id,
                    speed,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub pickup: Point,
    pub dropoff: Point,
    pub release_time: Tick,
    pub expiry_time: Tick,
}

impl TaskRecord {
    pub fn validate(&self, metric: DistanceMetric) -> Result<(), DataError> {
        for point in [self.pickup, self.dropoff] {
            if !metric.accepts(point) {
                return Err(DataError::invalid_coordinate(format!("task {}", self.id), point));
            }
        }
        if self.expiry_time <= self.release_time {
            return Err(DataError::ExpiryNotAfterRelease {
                task: self.id,
                release_time: self.release_time,
                expiry_time: self.expiry_time,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputRecord {
    Worker(WorkerRecord),
    Task(TaskRecord),
    EndOfStream,
}

/// A worker or task record waiting in the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    Worker(WorkerRecord),
    Task(TaskRecord),
}

impl EntityRecord {
    pub fn release_time(&self) -> Tick {
        match self {
            EntityRecord::Worker(record) => record.release_time,
            EntityRecord::Task(record) => record.release_time,
        }
    }
}

#[derive(Debug)]
struct Queued {
    release_time: Tick,
    seq: u64,
    record: EntityRecord,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.release_time == other.release_time && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by release time.
        other
            .release_time
            .cmp(&self.release_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Records that have been ingested but not yet admitted.
#[derive(Debug, Default, Resource)]
pub struct PendingInput {
    queue: BinaryHeap<Queued>,
    next_seq: u64,
    queued_tasks: usize,
    closed: bool,
    /// Records that arrived after the end-of-stream marker.
    late_records: usize,
}

impl PendingInput {
    /// Queue one record. Returns `false` if the record was refused because the
    /// stream is already closed.
    pub fn push(&mut self, record: InputRecord) -> bool {
        let record = match record {
            InputRecord::EndOfStream => {
                self.closed = true;
                return true;
            }
            _ if self.closed => {
                self.late_records += 1;
                return false;
            }
            InputRecord::Worker(worker) => EntityRecord::Worker(worker),
            InputRecord::Task(task) => {
                self.queued_tasks += 1;
                EntityRecord::Task(task)
            }
        };
        self.queue.push(Queued {
            release_time: record.release_time(),
            seq: self.next_seq,
            record,
        });
        self.next_seq += 1;
        true
    }

    /// Remove and return every record with `release_time <= now`, in release
    /// then arrival order.
    pub fn pop_due(&mut self, now: Tick) -> Vec<EntityRecord> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|q| q.release_time <= now) {
            if let Some(queued) = self.queue.pop() {
                if matches!(queued.record, EntityRecord::Task(_)) {
                    self.queued_tasks -= 1;
                }
                due.push(queued.record);
            }
        }
        due
    }

    /// Release time of the next queued record.
    pub fn next_release(&self) -> Option<Tick> {
        self.queue.peek().map(|q| q.release_time)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_tasks(&self) -> usize {
        self.queued_tasks
    }

    /// Takes the count of records refused since the last call.
    pub fn take_late_records(&mut self) -> usize {
        std::mem::take(&mut self.late_records)
    }
}
