//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use matchfetch::checkpoint::Checkpoint;
use matchfetch::client::{Branch, MatchPage, MatchSource, SubjourneyNames};
use matchfetch::models::{MatchFetchError, MatchFilter, Record, RegionShare, RequestSignature, Result};
use matchfetch::pipeline::{CancellationFlag, ExportReport, Exporter};
use serde_json::{Map, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub fn record(id: &str) -> Record {
    let mut payload = Map::new();
    payload.insert("matchProfile".into(), json!({ "displayName": format!("Match {id}") }));
    payload.insert("relationship".into(), json!({ "sharedCentimorgans": 42 }));
    Record::new(id, payload)
}

pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i:04}")).collect()
}

pub fn signature(guid: &str, count: u64) -> RequestSignature {
    RequestSignature::new(guid, MatchFilter::All, count, vec![], None).unwrap()
}

/// In-memory match service.
///
/// Pages are served from a fixed list; enrichment is derived from the id.
pub struct FakeSource {
    pages: Vec<Vec<Record>>,
    pub page_requests: Mutex<Vec<usize>>,
    pub batch_requests: Mutex<Vec<Vec<String>>>,
    fail_page: Mutex<Option<usize>>,
    fail_batch_call: Mutex<Option<usize>>,
    cancel_on_page: Mutex<Option<(usize, CancellationFlag)>>,
}

impl FakeSource {
    /// `count` distinct records split into pages of `page_size`.
    pub fn with_matches(count: usize, page_size: usize) -> Self {
        let records: Vec<Record> = ids("m", count).iter().map(|id| record(id)).collect();
        Self::with_pages(records.chunks(page_size).map(<[Record]>::to_vec).collect())
    }

    /// Serve exactly these pages, in order.
    pub fn with_pages(pages: Vec<Vec<Record>>) -> Self {
        Self {
            pages,
            page_requests: Mutex::new(Vec::new()),
            batch_requests: Mutex::new(Vec::new()),
            fail_page: Mutex::new(None),
            fail_batch_call: Mutex::new(None),
            cancel_on_page: Mutex::new(None),
        }
    }

    pub fn fail_on_page(&self, page: usize) {
        *self.fail_page.lock().unwrap() = Some(page);
    }

    pub fn fail_on_batch_call(&self, call: usize) {
        *self.fail_batch_call.lock().unwrap() = Some(call);
    }

    /// Trip `flag` once `page` has been served.
    pub fn cancel_on_page(&self, page: usize, flag: CancellationFlag) {
        *self.cancel_on_page.lock().unwrap() = Some((page, flag));
    }

    pub fn pages_requested(&self) -> Vec<usize> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn batches_requested(&self) -> Vec<Vec<String>> {
        self.batch_requests.lock().unwrap().clone()
    }

    pub fn reset_requests(&self) {
        self.page_requests.lock().unwrap().clear();
        self.batch_requests.lock().unwrap().clear();
    }
}

fn journey_for(id: &str) -> String {
    let last = id.bytes().last().unwrap_or(b'0');
    format!("j{}", last % 3)
}

impl MatchSource for FakeSource {
    async fn fetch_page(
        &self,
        _signature: &RequestSignature,
        page: usize,
        _page_size: usize,
    ) -> Result<MatchPage> {
        self.page_requests.lock().unwrap().push(page);
        {
            let mut fail = self.fail_page.lock().unwrap();
            if *fail == Some(page) {
                *fail = None;
                return Err(MatchFetchError::UnexpectedStatus {
                    endpoint: "matchList".into(),
                    status: 503,
                });
            }
        }
        if let Some((at, flag)) = self.cancel_on_page.lock().unwrap().as_ref() {
            if *at == page {
                flag.cancel();
            }
        }

        let records = self.pages.get(page - 1).cloned().unwrap_or_default();
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
        {
            let mut fail = self.fail_batch_call.lock().unwrap();
            if *fail == Some(call) {
                *fail = None;
                return Err(MatchFetchError::RateLimited {
                    endpoint: "batchCommunities".into(),
                    retry_after_secs: 30.0,
                });
            }
        }

        Ok(sample_ids
            .iter()
            .map(|id| {
                let journey = journey_for(id);
                let branch = Branch {
                    community_ids: vec![format!("{journey}-c")],
                    id: journey,
                };
                (id.clone(), vec![branch])
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
                let share = RegionShare {
                    key: "08100".into(),
                    percentage: 75.0,
                };
                (id.clone(), vec![share])
            })
            .collect())
    }

    async fn journey_names(&self, journey_ids: &[String]) -> Result<HashMap<String, String>> {
        Ok(journey_ids
            .iter()
            .map(|id| (id.clone(), format!("Journey {id}")))
            .collect())
    }

    async fn subjourney_names(&self, journey_ids: &[String]) -> Result<SubjourneyNames> {
        Ok(journey_ids
            .iter()
            .map(|id| {
                let names = HashMap::from([(format!("{id}-c"), format!("Community {id}"))]);
                (id.clone(), names)
            })
            .collect())
    }
}

/// Exporter keeping the exported records in memory.
#[derive(Default)]
pub struct CapturingExporter {
    pub exported: Mutex<Option<Vec<Record>>>,
    fail: bool,
}

impl CapturingExporter {
    pub fn failing() -> Self {
        Self {
            exported: Mutex::new(None),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.exported.lock().unwrap().clone().unwrap_or_default()
    }
}

impl Exporter for CapturingExporter {
    fn export(&self, checkpoint: &Checkpoint) -> Result<ExportReport> {
        if self.fail {
            return Err(MatchFetchError::export("memory", "refused"));
        }
        *self.exported.lock().unwrap() = Some(checkpoint.records.clone());
        Ok(ExportReport {
            path: PathBuf::from("memory"),
            rows: checkpoint.records.len(),
        })
    }
}
