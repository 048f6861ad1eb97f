//! matchfetch - Resumable fetch-and-enrich exporter for DNA match lists.
//!
//! ## Architecture
//!
//! A run walks one pipeline:
//! - **Paginator**: Fetches list pages, dedupes by identifier, saves after every page
//! - **Batch Enricher**: Looks up journeys and regions in fixed-size batches, saves after every batch
//! - **Exporter**: Writes the finished records to CSV
//!
//! Progress lives in a single checkpoint file keyed by the request parameters;
//! an interrupted run picks up where the last save left off.
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (types, enums)
//! - B_i (Beliefs): Runtime fallible operations (Result, Option)
//! - I^R (Resolvable): User-configurable parameters
//! - I^B (Bounded): Network/service uncertainties (throttle, resume)

pub mod checkpoint;
pub mod client;
pub mod export;
pub mod models;
pub mod pipeline;

// Re-exports for convenience
pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use client::{Credentials, FixedDelay, MatchClient, MatchSource, NoDelay, Throttle};
pub use export::CsvExporter;
pub use models::{Config, MatchFetchError, MatchFilter, Record, RequestSignature, Result};
pub use pipeline::{
    CancellationFlag, Pipeline, PipelineOptions, ProgressSink, RunOutcome, RunState, Stage,
};
