//! Batch enrichment of fetched records.
//!
//! Epistemic foundation:
//! - K_i: Batches are fixed-size slices of the records in fetch order
//! - K_i: A record is marked enriched only with all four fields populated
//! - B_i: Any auxiliary call might fail → the whole batch is discarded
//! - I^B: The service may omit identifiers → enriched with empty lists

use super::{CancellationFlag, Progress, ProgressSink, Stage};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::client::{Branch, MatchSource, SubjourneyNames, Throttle};
use crate::models::{Enrichment, RegionShare, Result};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Result of an enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Batches that issued network calls
    pub batches_processed: usize,
    /// Batches already complete on entry
    pub batches_skipped: usize,
    /// Records enriched by this pass
    pub records_enriched: usize,
}

/// Raw enrichment for one batch, before name resolution.
#[derive(Debug, Default)]
struct EnrichmentIndex {
    entries: Vec<(String, Vec<Branch>, Vec<RegionShare>)>,
    journey_ids: BTreeSet<String>,
    with_subjourneys: BTreeSet<String>,
}

impl EnrichmentIndex {
    fn build(
        pending: &[String],
        mut communities: HashMap<String, Vec<Branch>>,
        mut ethnicities: HashMap<String, Vec<RegionShare>>,
    ) -> Self {
        let mut index = Self::default();
        for id in pending {
            let branches = communities.remove(id).unwrap_or_default();
            let regions = ethnicities.remove(id).unwrap_or_default();
            for branch in &branches {
                index.journey_ids.insert(branch.id.clone());
                if !branch.community_ids.is_empty() {
                    index.with_subjourneys.insert(branch.id.clone());
                }
            }
            index.entries.push((id.clone(), branches, regions));
        }
        index
    }

    /// Turn the index into per-record enrichments.
    ///
    /// Sub-journey names come only from the record's own branches.
    fn resolve(
        self,
        journey_names: &HashMap<String, String>,
        subjourney_names: &SubjourneyNames,
    ) -> HashMap<String, Enrichment> {
        self.entries
            .into_iter()
            .map(|(id, branches, regions)| {
                // One entry per branch; repeated journeys stay repeated
                let journeys: Vec<String> = branches.iter().map(|b| b.id.clone()).collect();

                let journey_labels = journeys
                    .iter()
                    .map(|j| journey_names.get(j).unwrap_or(j).clone())
                    .collect();

                let mut seen = HashSet::new();
                let mut subjourneys = Vec::new();
                for branch in &branches {
                    let Some(names) = subjourney_names.get(&branch.id) else {
                        continue;
                    };
                    for community in &branch.community_ids {
                        if let Some(name) = names.get(community) {
                            if seen.insert(name.as_str()) {
                                subjourneys.push(name.clone());
                            }
                        }
                    }
                }

                let enrichment = Enrichment {
                    journeys,
                    journey_names: journey_labels,
                    subjourneys,
                    regions,
                };
                (id, enrichment)
            })
            .collect()
    }
}

/// Enriches checkpoint records batch by batch.
pub struct BatchEnricher<'a, S, C, T> {
    source: &'a S,
    store: &'a C,
    throttle: &'a T,
    batch_size: usize,
    cancel: &'a CancellationFlag,
}

impl<'a, S, C, T> BatchEnricher<'a, S, C, T>
where
    S: MatchSource,
    C: CheckpointStore,
    T: Throttle,
{
    pub fn new(
        source: &'a S,
        store: &'a C,
        throttle: &'a T,
        batch_size: usize,
        cancel: &'a CancellationFlag,
    ) -> Self {
        Self {
            source,
            store,
            throttle,
            batch_size: batch_size.max(1),
            cancel,
        }
    }

    /// Enrich every record not yet in the enriched set.
    ///
    /// The checkpoint is saved after each processed batch. On error the
    /// failing batch leaves no trace and earlier batches stay enriched.
    pub async fn enrich(
        &self,
        checkpoint: &mut Checkpoint,
        sink: &impl ProgressSink,
    ) -> Result<EnrichmentSummary> {
        let ids: Vec<String> = checkpoint
            .records
            .iter()
            .map(|r| r.sample_id.clone())
            .collect();
        let positions: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let total_batches = ids.len().div_ceil(self.batch_size);

        let mut summary = EnrichmentSummary::default();
        let mut throttle_next = false;

        for (index, chunk) in ids.chunks(self.batch_size).enumerate() {
            let pending: Vec<String> = chunk
                .iter()
                .filter(|id| !checkpoint.is_enriched(id))
                .cloned()
                .collect();

            if pending.is_empty() {
                summary.batches_skipped += 1;
            } else {
                self.cancel.check()?;
                if throttle_next {
                    self.throttle.wait().await;
                }

                let test_guid = checkpoint.signature.test_guid.clone();
                let staged = self.enrich_batch(&test_guid, &pending).await?;

                for (id, enrichment) in staged {
                    if let Some(&pos) = positions.get(id.as_str()) {
                        checkpoint.records[pos].apply(enrichment);
                    }
                }
                checkpoint.enriched_ids.extend(pending.iter().cloned());
                checkpoint.saved_at = Some(Utc::now());
                self.store.save(checkpoint)?;

                summary.batches_processed += 1;
                summary.records_enriched += pending.len();
                throttle_next = true;
                debug!(
                    batch = index + 1,
                    of = total_batches,
                    records = pending.len(),
                    "Batch saved"
                );
            }

            sink.progress(&Progress {
                stage: Stage::Enriching,
                unit: index + 1,
                total: Some(total_batches),
                processed: checkpoint.enriched_count(),
            });
        }

        Ok(summary)
    }

    /// Fetch and resolve one batch without touching the checkpoint.
    async fn enrich_batch(
        &self,
        test_guid: &str,
        pending: &[String],
    ) -> Result<HashMap<String, Enrichment>> {
        let communities = self.source.batch_communities(test_guid, pending).await?;
        let ethnicities = self.source.batch_ethnicities(test_guid, pending).await?;
        let index = EnrichmentIndex::build(pending, communities, ethnicities);

        let journey_names = if index.journey_ids.is_empty() {
            HashMap::new()
        } else {
            let ids: Vec<String> = index.journey_ids.iter().cloned().collect();
            self.source.journey_names(&ids).await?
        };
        let subjourney_names = if index.with_subjourneys.is_empty() {
            HashMap::new()
        } else {
            let ids: Vec<String> = index.with_subjourneys.iter().cloned().collect();
            self.source.subjourney_names(&ids).await?
        };

        Ok(index.resolve(&journey_names, &subjourney_names))
    }
}
