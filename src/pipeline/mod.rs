//! Pipeline module - checkpointed fetch, enrichment and run orchestration.

mod enricher;
mod orchestrator;
mod paginator;
mod progress;

#[cfg(test)]
pub(crate) mod testing;

pub use enricher::*;
pub use orchestrator::*;
pub use paginator::*;
pub use progress::*;
