//! Scripted in-memory source shared by the pipeline unit tests.

use super::{Progress, ProgressSink, RunState, Stage};
use crate::client::{Branch, MatchPage, MatchSource, SubjourneyNames};
use crate::models::{MatchFetchError, Record, RegionShare, RequestSignature, Result};
use serde_json::{Map, json};
use std::collections::HashMap;
use std::sync::Mutex;

pub(crate) fn record(id: &str) -> Record {
    let mut payload = Map::new();
    payload.insert("matchProfile".into(), json!({ "displayName": format!("Match {id}") }));
    Record::new(id, payload)
}

fn parity(id: &str) -> &'static str {
    let last = id.bytes().last().unwrap_or(b'0');
    if last % 2 == 0 { "even" } else { "odd" }
}

/// Serves `available` records page by page and derives enrichment from ids.
pub(crate) struct FakeSource {
    available: Vec<Record>,
    pub page_requests: Mutex<Vec<usize>>,
    pub batch_requests: Mutex<Vec<Vec<String>>>,
    pub name_requests: Mutex<usize>,
    fail_page: Mutex<Option<usize>>,
    fail_batch: Mutex<Option<usize>>,
}

impl FakeSource {
    pub fn with_matches(count: usize) -> Self {
        Self::with_records((0..count).map(|i| record(&format!("m{i:04}"))).collect())
    }

    pub fn with_records(available: Vec<Record>) -> Self {
        Self {
            available,
            page_requests: Mutex::new(Vec::new()),
            batch_requests: Mutex::new(Vec::new()),
            name_requests: Mutex::new(0),
            fail_page: Mutex::new(None),
            fail_batch: Mutex::new(None),
        }
    }

    /// Fail the next request for `page` once.
    pub fn fail_on_page(&self, page: usize) {
        *self.fail_page.lock().unwrap() = Some(page);
    }

    /// Fail the `call`-th communities request (1-based, counted overall) once.
    pub fn fail_on_batch_call(&self, call: usize) {
        *self.fail_batch.lock().unwrap() = Some(call);
    }

    pub fn pages(&self) -> Vec<usize> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batch_requests.lock().unwrap().clone()
    }
}

impl MatchSource for FakeSource {
    async fn fetch_page(
        &self,
        _signature: &RequestSignature,
        page: usize,
        page_size: usize,
    ) -> Result<MatchPage> {
        self.page_requests.lock().unwrap().push(page);
        let mut fail = self.fail_page.lock().unwrap();
        if *fail == Some(page) {
            *fail = None;
            return Err(MatchFetchError::UnexpectedStatus {
                endpoint: "matchList".into(),
                status: 500,
            });
        }

        let start = ((page - 1) * page_size).min(self.available.len());
        let end = (start + page_size).min(self.available.len());
        let records = self.available[start..end].to_vec();
        Ok(MatchPage {
            returned: records.len(),
            records,
        })
    }

    async fn batch_communities(
        &self,
        _test_guid: &str,
        sample_ids: &[String],
    ) -> Result<HashMap<String, Vec<Branch>>> {
        let call = {
            let mut requests = self.batch_requests.lock().unwrap();
            requests.push(sample_ids.to_vec());
            requests.len()
        };
        let mut fail = self.fail_batch.lock().unwrap();
        if *fail == Some(call) {
            *fail = None;
            return Err(MatchFetchError::Timeout(std::time::Duration::from_secs(60)));
        }

        Ok(sample_ids
            .iter()
            .map(|id| {
                let side = parity(id);
                let branches = vec![Branch {
                    id: format!("j-{side}"),
                    community_ids: vec![format!("c-{side}")],
                }];
                (id.clone(), branches)
            })
            .collect())
    }

    async fn batch_ethnicities(
        &self,
        _test_guid: &str,
        sample_ids: &[String],
    ) -> Result<HashMap<String, Vec<RegionShare>>> {
        Ok(sample_ids
            .iter()
            .map(|id| {
                let regions = vec![RegionShare {
                    key: "08100".into(),
                    percentage: 50.0,
                }];
                (id.clone(), regions)
            })
            .collect())
    }

    async fn journey_names(&self, journey_ids: &[String]) -> Result<HashMap<String, String>> {
        *self.name_requests.lock().unwrap() += 1;
        Ok(journey_ids
            .iter()
            .map(|id| (id.clone(), format!("Journey {id}")))
            .collect())
    }

    async fn subjourney_names(&self, journey_ids: &[String]) -> Result<SubjourneyNames> {
        *self.name_requests.lock().unwrap() += 1;
        Ok(journey_ids
            .iter()
            .map(|id| {
                let community = id.replacen("j-", "c-", 1);
                let name = format!("Community {community}");
                (id.clone(), HashMap::from([(community, name)]))
            })
            .collect())
    }
}

/// Sink keeping every state transition and progress event.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub states: Mutex<Vec<RunState>>,
    pub events: Mutex<Vec<Progress>>,
}

impl RecordingSink {
    /// `(unit, total, processed)` for each event of `stage`.
    pub fn units(&self, stage: Stage) -> Vec<(usize, Option<usize>, usize)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.stage == stage)
            .map(|p| (p.unit, p.total, p.processed))
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn stage(&self, state: RunState) {
        self.states.lock().unwrap().push(state);
    }

    fn progress(&self, progress: &Progress) {
        self.events.lock().unwrap().push(*progress);
    }
}
