//! Remote data source contract used by the pipeline.
//!
//! K_i: Payloads arrive here already validated; the pipeline never inspects
//! raw JSON shapes.

use crate::models::{Record, RegionShare, RequestSignature, Result};
use std::collections::HashMap;

/// One page of the match list.
#[derive(Debug, Clone, Default)]
pub struct MatchPage {
    /// Items that carried a valid identifier
    pub records: Vec<Record>,
    /// Number of items the service returned, valid or not
    pub returned: usize,
}

impl MatchPage {
    /// Check if the service returned no items.
    pub fn is_empty(&self) -> bool {
        self.returned == 0
    }
}

/// A journey attached to a record, with its sub-journey ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub id: String,
    pub community_ids: Vec<String>,
}

/// Sub-journey names keyed by journey id, then by sub-journey id.
pub type SubjourneyNames = HashMap<String, HashMap<String, String>>;

/// Endpoints the fetch-and-enrich pipeline depends on.
///
/// All calls are issued sequentially by a single run.
#[allow(async_fn_in_trait)]
pub trait MatchSource {
    /// Fetch one page (1-based) of the list selected by `signature`.
    async fn fetch_page(
        &self,
        signature: &RequestSignature,
        page: usize,
        page_size: usize,
    ) -> Result<MatchPage>;

    /// Journey branches per identifier.
    async fn batch_communities(
        &self,
        test_guid: &str,
        sample_ids: &[String],
    ) -> Result<HashMap<String, Vec<Branch>>>;

    /// Region shares per identifier; only entries with key and percentage.
    async fn batch_ethnicities(
        &self,
        test_guid: &str,
        sample_ids: &[String],
    ) -> Result<HashMap<String, Vec<RegionShare>>>;

    /// Display names for journey ids.
    async fn journey_names(&self, journey_ids: &[String]) -> Result<HashMap<String, String>>;

    /// Sub-journey display names for the given journey ids.
    async fn subjourney_names(&self, journey_ids: &[String]) -> Result<SubjourneyNames>;
}
