//! Checkpoint module for resumable runs.
//!
//! Provides:
//! - `Checkpoint`: Snapshot of fetched records and enriched ids for one signature
//! - `CheckpointStore`: Load/save/clear contract
//! - `FileCheckpointStore`: Atomic JSON file persistence
//! - `MemoryCheckpointStore`: In-memory store for tests and dry runs

mod state;
mod store;

pub use state::*;
pub use store::*;
