//! Paginated list fetching with deduplication.
//!
//! Epistemic foundation:
//! - K_i: Page indices are 1-based and fixed-size
//! - K_i: A short or empty page means the list is exhausted
//! - B_i: Each page request might fail → checkpoint saved after every page

use super::{CancellationFlag, Progress, ProgressSink, Stage};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::client::{MatchSource, Throttle};
use crate::models::Result;
use chrono::Utc;
use tracing::debug;

/// Why pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The checkpoint holds the requested number of records
    TargetReached,
    /// The service returned fewer items than a full page
    ShortPage,
    /// The service returned no items
    EndOfData,
}

/// Result of a pagination pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSummary {
    pub pages_fetched: usize,
    pub records_added: usize,
    pub total_records: usize,
    pub stop_reason: StopReason,
}

/// Fetches list pages into a checkpoint until the target is met.
pub struct Paginator<'a, S, C, T> {
    source: &'a S,
    store: &'a C,
    throttle: &'a T,
    page_size: usize,
    cancel: &'a CancellationFlag,
}

impl<'a, S, C, T> Paginator<'a, S, C, T>
where
    S: MatchSource,
    C: CheckpointStore,
    T: Throttle,
{
    pub fn new(
        source: &'a S,
        store: &'a C,
        throttle: &'a T,
        page_size: usize,
        cancel: &'a CancellationFlag,
    ) -> Self {
        Self {
            source,
            store,
            throttle,
            page_size: page_size.max(1),
            cancel,
        }
    }

    /// Fetch pages until `target` records are held, or the list ends.
    ///
    /// Starts from the page following the records already in `checkpoint`.
    /// On error the records saved so far stay in `checkpoint` and in the store.
    pub async fn fetch(
        &self,
        checkpoint: &mut Checkpoint,
        target: u64,
        sink: &impl ProgressSink,
    ) -> Result<PaginationSummary> {
        let target = usize::try_from(target).unwrap_or(usize::MAX);
        let mut summary = PaginationSummary {
            pages_fetched: 0,
            records_added: 0,
            total_records: checkpoint.fetched_count(),
            stop_reason: StopReason::TargetReached,
        };

        if checkpoint.fetched_count() >= target {
            debug!(held = checkpoint.fetched_count(), target, "Target already met");
            return Ok(summary);
        }

        let expected_pages = (!checkpoint.signature.is_unbounded())
            .then(|| target.div_ceil(self.page_size));
        let mut seen = checkpoint.seen_ids();
        let mut page = checkpoint.fetched_count() / self.page_size + 1;

        loop {
            self.cancel.check()?;

            let result = self
                .source
                .fetch_page(&checkpoint.signature, page, self.page_size)
                .await?;
            summary.pages_fetched += 1;

            if result.is_empty() {
                debug!(page, "Empty page, end of data");
                sink.progress(&Progress {
                    stage: Stage::Paginating,
                    unit: page,
                    total: expected_pages,
                    processed: checkpoint.fetched_count(),
                });
                summary.stop_reason = StopReason::EndOfData;
                break;
            }

            let returned = result.returned;
            let remaining = target.saturating_sub(checkpoint.fetched_count());
            let fresh: Vec<_> = result
                .records
                .into_iter()
                .filter(|r| seen.insert(r.sample_id.clone()))
                .take(remaining)
                .collect();

            let added = fresh.len();
            checkpoint.records.extend(fresh);
            checkpoint.saved_at = Some(Utc::now());
            self.store.save(checkpoint)?;

            summary.records_added += added;
            summary.total_records = checkpoint.fetched_count();
            debug!(
                page,
                returned,
                added,
                total = summary.total_records,
                "Page saved"
            );
            sink.progress(&Progress {
                stage: Stage::Paginating,
                unit: page,
                total: expected_pages,
                processed: summary.total_records,
            });

            if returned < self.page_size {
                summary.stop_reason = StopReason::ShortPage;
                break;
            }
            if checkpoint.fetched_count() >= target {
                summary.stop_reason = StopReason::TargetReached;
                break;
            }

            self.throttle.wait().await;
            page += 1;
        }

        Ok(summary)
    }
}
