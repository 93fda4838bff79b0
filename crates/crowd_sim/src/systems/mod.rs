pub mod admission;
pub mod completion;
pub mod eviction;
pub mod idle;
pub mod matching;
pub mod metrics;
pub mod movement;
pub mod spatial_index;
