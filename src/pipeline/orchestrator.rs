//! Resume-or-start orchestration of a full run.
//!
//! Pipeline flow:
//! Checkpoint → Paginator → Batch Enricher → Exporter → checkpoint cleared

use super::{
    BatchEnricher, CancellationFlag, EnrichmentSummary, PaginationSummary, Paginator,
    ProgressSink, RunState, Stage,
};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::client::{MatchSource, Throttle};
use crate::models::{FetchConfig, MatchFetchError, RequestSignature, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Writes the records of a finished run somewhere durable.
pub trait Exporter {
    fn export(&self, checkpoint: &Checkpoint) -> Result<ExportReport>;
}

/// Where an export went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows: usize,
}

/// How the stored checkpoint was handled when a run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointResolution {
    /// No checkpoint existed
    Fresh,
    /// A checkpoint for the same signature was picked up
    Resumed { fetched: usize, enriched: usize },
    /// A checkpoint for another signature was thrown away
    Discarded { stale: Box<RequestSignature> },
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub resolution: CheckpointResolution,
    pub pagination: PaginationSummary,
    pub enrichment: EnrichmentSummary,
    pub export: ExportReport,
    pub elapsed: Duration,
}

/// A run that stopped before completion.
#[derive(Debug)]
pub struct RunFailure {
    pub stage: Stage,
    pub error: MatchFetchError,
    /// Records held in memory when the run stopped
    pub fetched: usize,
    pub enriched: usize,
    /// Records held by the stored checkpoint a re-run resumes from
    pub saved_fetched: usize,
    pub saved_enriched: usize,
    /// Whether the store holds a checkpoint for the same parameters
    pub resumable: bool,
    /// In-memory state at the point of failure, including unsaved records
    pub checkpoint: Checkpoint,
}

impl RunFailure {
    /// Records fetched in memory but missing from the stored checkpoint.
    pub fn unsaved(&self) -> usize {
        self.fetched.saturating_sub(self.saved_fetched)
    }
}

/// Final state of a run. Errors are carried here, never raised.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Failed(RunFailure),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// Page and batch sizes for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub page_size: usize,
    pub batch_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            batch_size: 24,
        }
    }
}

impl From<&FetchConfig> for PipelineOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            page_size: config.page_size,
            batch_size: config.batch_size,
        }
    }
}

/// Checkpointed fetch-and-enrich pipeline.
pub struct Pipeline<S, C, T> {
    source: S,
    store: C,
    throttle: T,
    options: PipelineOptions,
    cancel: CancellationFlag,
}

impl<S, C, T> Pipeline<S, C, T>
where
    S: MatchSource,
    C: CheckpointStore,
    T: Throttle,
{
    /// Create a new pipeline.
    pub fn new(source: S, store: C, throttle: T, options: PipelineOptions) -> Self {
        Self {
            source,
            store,
            throttle,
            options,
            cancel: CancellationFlag::new(),
        }
    }

    /// Share a cancellation flag with the caller.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn throttle(&self) -> &T {
        &self.throttle
    }

    /// Pick up the stored checkpoint if it belongs to `signature`.
    pub fn resolve(&self, signature: RequestSignature) -> (Checkpoint, CheckpointResolution) {
        match self.store.load() {
            Some(checkpoint) if checkpoint.signature == signature => {
                let resolution = CheckpointResolution::Resumed {
                    fetched: checkpoint.fetched_count(),
                    enriched: checkpoint.enriched_count(),
                };
                (checkpoint, resolution)
            }
            Some(stale) => (
                Checkpoint::new(signature),
                CheckpointResolution::Discarded {
                    stale: Box::new(stale.signature),
                },
            ),
            None => (Checkpoint::new(signature), CheckpointResolution::Fresh),
        }
    }

    /// Run to completion, resuming any matching checkpoint.
    pub async fn run<E, P>(&self, signature: RequestSignature, exporter: &E, sink: &P) -> RunOutcome
    where
        E: Exporter,
        P: ProgressSink,
    {
        let start = Instant::now();
        sink.stage(RunState::Idle);

        // Resolving
        sink.stage(Stage::Resolving.into());
        let (mut checkpoint, resolution) = self.resolve(signature);
        match &resolution {
            CheckpointResolution::Fresh => info!("No checkpoint found, starting fresh"),
            CheckpointResolution::Resumed { fetched, enriched } => {
                info!(fetched, enriched, "Resuming from checkpoint")
            }
            CheckpointResolution::Discarded { stale } => {
                info!(
                    stale_test = %stale.test_guid,
                    "Checkpoint belongs to different parameters, discarding"
                );
                if let Err(e) = self.store.clear() {
                    return self.fail(Stage::Resolving, e, checkpoint, sink);
                }
            }
        }

        // Paginating
        sink.stage(Stage::Paginating.into());
        let target = checkpoint.signature.target_count();
        let paginator = Paginator::new(
            &self.source,
            &self.store,
            &self.throttle,
            self.options.page_size,
            &self.cancel,
        );
        let pagination = match paginator.fetch(&mut checkpoint, target, sink).await {
            Ok(summary) => summary,
            Err(e) => return self.fail(Stage::Paginating, e, checkpoint, sink),
        };
        info!(
            pages = pagination.pages_fetched,
            added = pagination.records_added,
            total = pagination.total_records,
            stop = ?pagination.stop_reason,
            "Pagination complete"
        );

        // Enriching
        sink.stage(Stage::Enriching.into());
        let enricher = BatchEnricher::new(
            &self.source,
            &self.store,
            &self.throttle,
            self.options.batch_size,
            &self.cancel,
        );
        let enrichment = match enricher.enrich(&mut checkpoint, sink).await {
            Ok(summary) => summary,
            Err(e) => return self.fail(Stage::Enriching, e, checkpoint, sink),
        };
        info!(
            batches = enrichment.batches_processed,
            skipped = enrichment.batches_skipped,
            enriched = checkpoint.enriched_count(),
            "Enrichment complete"
        );

        // Exporting
        sink.stage(Stage::Exporting.into());
        let export = match exporter.export(&checkpoint) {
            Ok(report) => report,
            Err(e) => return self.fail(Stage::Exporting, e, checkpoint, sink),
        };
        if let Err(e) = self.store.clear() {
            return self.fail(Stage::Exporting, e, checkpoint, sink);
        }

        let elapsed = start.elapsed();
        info!(
            path = %export.path.display(),
            rows = export.rows,
            elapsed_secs = elapsed.as_secs_f64(),
            "Run complete"
        );
        sink.stage(RunState::Done);

        RunOutcome::Completed(RunReport {
            resolution,
            pagination,
            enrichment,
            export,
            elapsed,
        })
    }

    fn fail(
        &self,
        stage: Stage,
        error: MatchFetchError,
        checkpoint: Checkpoint,
        sink: &impl ProgressSink,
    ) -> RunOutcome {
        let saved = self
            .store
            .load()
            .filter(|saved| saved.signature == checkpoint.signature);
        let (saved_fetched, saved_enriched) = saved
            .as_ref()
            .map_or((0, 0), |s| (s.fetched_count(), s.enriched_count()));
        let resumable = saved.is_some();

        if matches!(error, MatchFetchError::Cancelled) {
            warn!(%stage, fetched = checkpoint.fetched_count(), saved_fetched, "Run cancelled");
        } else {
            error!(
                %stage,
                error = %error,
                fatal = error.is_fatal(),
                fetched = checkpoint.fetched_count(),
                enriched = checkpoint.enriched_count(),
                saved_fetched,
                saved_enriched,
                resumable,
                "Run failed"
            );
        }
        sink.stage(RunState::Failed(stage));

        RunOutcome::Failed(RunFailure {
            stage,
            error,
            fetched: checkpoint.fetched_count(),
            enriched: checkpoint.enriched_count(),
            saved_fetched,
            saved_enriched,
            resumable,
            checkpoint,
        })
    }
}
