//! Run states, progress events and cancellation.

use crate::models::{MatchFetchError, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stage of a run that can perform work or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Resolving,
    Paginating,
    Enriching,
    Exporting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolving => "resolving",
            Stage::Paginating => "paginating",
            Stage::Enriching => "enriching",
            Stage::Exporting => "exporting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one pipeline run.
///
/// `Idle → Resolving → Paginating → Enriching → Exporting → Done`; any working
/// stage may end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Resolving,
    Paginating,
    Enriching,
    Exporting,
    Done,
    Failed(Stage),
}

impl From<Stage> for RunState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Resolving => RunState::Resolving,
            Stage::Paginating => RunState::Paginating,
            Stage::Enriching => RunState::Enriching,
            Stage::Exporting => RunState::Exporting,
        }
    }
}

/// One unit of work completed within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    /// 1-based page or batch number
    pub unit: usize,
    /// Expected number of units, when known
    pub total: Option<usize>,
    /// Records fetched or enriched so far
    pub processed: usize,
}

/// Passive observer of a run.
///
/// Implementations must not fail or block; the pipeline ignores them.
pub trait ProgressSink {
    /// Called on every state transition.
    fn stage(&self, _state: RunState) {}

    /// Called after every page and every batch.
    fn progress(&self, _progress: &Progress) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Shared flag requesting a run to stop at the next page or batch boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MatchFetchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
