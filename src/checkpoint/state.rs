//! Checkpoint snapshot for resumable runs.
//!
//! Epistemic foundation:
//! - K_i: A checkpoint binds one signature to its records and enriched ids
//! - K_i: Record identifiers are unique within a checkpoint
//! - B_i: A resumed checkpoint may predate `enriched_ids` → inferred

use crate::models::{Record, RequestSignature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Snapshot of one run's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Parameters of the run
    #[serde(rename = "params")]
    pub signature: RequestSignature,
    /// Fetched records, in fetch order
    #[serde(rename = "matches", default)]
    pub records: Vec<Record>,
    /// Identifiers whose enrichment is complete
    #[serde(default)]
    pub enriched_ids: BTreeSet<String>,
    /// When this snapshot was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// Create an empty checkpoint for a signature.
    pub fn new(signature: RequestSignature) -> Self {
        Self {
            signature,
            records: Vec::new(),
            enriched_ids: BTreeSet::new(),
            saved_at: None,
        }
    }

    /// Identifiers of all fetched records.
    pub fn seen_ids(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.sample_id.clone()).collect()
    }

    /// Whether a record has been enriched.
    pub fn is_enriched(&self, sample_id: &str) -> bool {
        self.enriched_ids.contains(sample_id)
    }

    /// Number of fetched records.
    pub fn fetched_count(&self) -> usize {
        self.records.len()
    }

    /// Number of enriched records.
    pub fn enriched_count(&self) -> usize {
        self.enriched_ids.len()
    }

    /// Check if every fetched record is enriched.
    pub fn is_fully_enriched(&self) -> bool {
        self.records.iter().all(|r| self.is_enriched(&r.sample_id))
    }

    /// Repair a snapshot read from disk.
    ///
    /// Drops duplicate identifiers (first occurrence wins), forgets enriched
    /// ids whose record is missing or not fully populated, and, when no ids
    /// are recorded at all, infers them from records already carrying both
    /// journeys and regions.
    pub fn normalize(&mut self) {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records.retain(|r| seen.insert(r.sample_id.clone()));

        if self.enriched_ids.is_empty() {
            self.enriched_ids = self
                .records
                .iter()
                .filter(|r| r.journeys.is_some() && r.regions.is_some())
                .map(|r| r.sample_id.clone())
                .collect();
        }

        let complete: HashSet<&str> = self
            .records
            .iter()
            .filter(|r| r.is_enriched())
            .map(|r| r.sample_id.as_str())
            .collect();
        self.enriched_ids.retain(|id| complete.contains(id.as_str()));
    }
}
