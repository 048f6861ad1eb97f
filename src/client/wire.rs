//! Wire types for the match service and their validated conversions.
//!
//! Every response body is decoded here, once. Malformed bodies become
//! `Decode` errors; individually malformed entries are dropped.

use super::{Branch, MatchPage, SubjourneyNames};
use crate::models::{MatchFetchError, Record, RegionShare, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// Internal Wire Types (match the service JSON exactly)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireMatchList {
    #[serde(rename = "matchList", default)]
    match_list: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct WireCommunities {
    #[serde(default)]
    branches: Option<Vec<WireBranch>>,
}

#[derive(Debug, Deserialize)]
struct WireBranch {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    communities: Option<Vec<WireCommunity>>,
}

#[derive(Debug, Deserialize)]
struct WireCommunity {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireEthnicity {
    #[serde(default)]
    regions: Option<Vec<WireRegion>>,
}

#[derive(Debug, Deserialize)]
struct WireRegion {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTests {
    #[serde(default)]
    dna_samples_data: Vec<WireTestSample>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTestSample {
    #[serde(default)]
    subject_name: Option<String>,
    #[serde(default)]
    test_guid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCount {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct WirePaternalCluster {
    #[serde(default)]
    item: Option<WireClusterItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClusterItem {
    #[serde(default)]
    cluster_code: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// A DNA test the account can browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSummary {
    pub subject_name: String,
    pub test_guid: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────────────────────────────────────

fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| MatchFetchError::decode(endpoint, e))
}

pub(crate) fn parse_match_list(body: &[u8]) -> Result<MatchPage> {
    let wire: WireMatchList = decode("matchList", body)?;
    let items = wire.match_list.unwrap_or_default();
    let returned = items.len();
    let records: Vec<Record> = items
        .into_iter()
        .filter_map(Record::from_list_item)
        .collect();

    if records.len() < returned {
        warn!(
            dropped = returned - records.len(),
            "Dropped list items without a sampleId"
        );
    }
    Ok(MatchPage { records, returned })
}

pub(crate) fn parse_communities(body: &[u8]) -> Result<HashMap<String, Vec<Branch>>> {
    let wire: HashMap<String, Option<WireCommunities>> = decode("batchCommunities", body)?;
    Ok(wire
        .into_iter()
        .map(|(sample_id, entry)| {
            let branches = entry
                .and_then(|c| c.branches)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|b| {
                    let id = b.id.filter(|id| !id.is_empty())?;
                    let community_ids = b
                        .communities
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|c| c.id)
                        .collect();
                    Some(Branch { id, community_ids })
                })
                .collect();
            (sample_id, branches)
        })
        .collect())
}

pub(crate) fn parse_ethnicities(body: &[u8]) -> Result<HashMap<String, Vec<RegionShare>>> {
    let wire: HashMap<String, Option<WireEthnicity>> = decode("batchEthnicity", body)?;
    Ok(wire
        .into_iter()
        .map(|(sample_id, entry)| {
            let regions = entry
                .and_then(|e| e.regions)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|r| {
                    Some(RegionShare {
                        key: r.key?,
                        percentage: r.percentage?,
                    })
                })
                .collect();
            (sample_id, regions)
        })
        .collect())
}

pub(crate) fn parse_journey_names(body: &[u8]) -> Result<HashMap<String, String>> {
    let wire: HashMap<String, Value> = decode("branches/names", body)?;
    Ok(wire
        .into_iter()
        .filter_map(|(id, name)| match name {
            Value::String(name) => Some((id, name)),
            _ => None,
        })
        .collect())
}

pub(crate) fn parse_subjourney_names(body: &[u8]) -> Result<SubjourneyNames> {
    let wire: HashMap<String, Value> = decode("communities/names", body)?;
    Ok(wire
        .into_iter()
        .map(|(branch_id, entry)| {
            let names = match entry {
                Value::Object(map) => map
                    .into_iter()
                    .filter_map(|(id, name)| match name {
                        Value::String(name) => Some((id, name)),
                        _ => None,
                    })
                    .collect(),
                _ => HashMap::new(),
            };
            (branch_id, names)
        })
        .collect())
}

pub(crate) fn parse_tests(body: &[u8]) -> Result<Vec<TestSummary>> {
    let wire: WireTests = decode("dnaSubnav/tests", body)?;
    Ok(wire
        .dna_samples_data
        .into_iter()
        .filter_map(|s| {
            Some(TestSummary {
                subject_name: s.subject_name.unwrap_or_default(),
                test_guid: s.test_guid.filter(|g| !g.is_empty())?,
            })
        })
        .collect())
}

pub(crate) fn parse_count(body: &[u8]) -> Result<u64> {
    let wire: WireCount = decode("matchCount", body)?;
    Ok(wire.count)
}

pub(crate) fn parse_journey_options(body: &[u8]) -> Result<BTreeSet<String>> {
    let wire: HashMap<String, Value> = decode("journeys", body)?;
    Ok(wire
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|c| c.get("communityId")?.as_str())
        .map(str::to_string)
        .collect())
}

pub(crate) fn parse_paternal_cluster(body: &[u8]) -> Result<Option<String>> {
    let wire: WirePaternalCluster = decode("paternal-cluster", body)?;
    Ok(wire
        .item
        .and_then(|i| i.cluster_code)
        .filter(|code| code == "p1" || code == "p2"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_match_list_counts_raw_items() {
        let page = parse_match_list(&body(json!({
            "matchList": [{"sampleId": "a"}, {"noId": true}, {"sampleId": "b"}]
        })))
        .unwrap();
        assert_eq!(page.returned, 3);
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn test_match_list_missing_is_empty() {
        let page = parse_match_list(&body(json!({}))).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let err = parse_match_list(b"<html>sign in</html>").unwrap_err();
        assert!(matches!(err, MatchFetchError::Decode { .. }));
    }

    #[test]
    fn test_communities_tree() {
        let parsed = parse_communities(&body(json!({
            "s1": {"branches": [
                {"id": "j1", "communities": [{"id": "c1"}, {"name": "no id"}, {"id": "c2"}]},
                {"id": "j2"},
                {"communities": [{"id": "orphan"}]}
            ]},
            "s2": null,
            "s3": {}
        })))
        .unwrap();

        assert_eq!(
            parsed["s1"],
            vec![
                Branch {
                    id: "j1".to_string(),
                    community_ids: vec!["c1".to_string(), "c2".to_string()],
                },
                Branch {
                    id: "j2".to_string(),
                    community_ids: vec![],
                },
            ]
        );
        assert!(parsed["s2"].is_empty());
        assert!(parsed["s3"].is_empty());
    }

    #[test]
    fn test_ethnicities_keep_complete_entries() {
        let parsed = parse_ethnicities(&body(json!({
            "s1": {"regions": [
                {"key": "08100", "label": "England", "percentage": 61},
                {"key": "08400"},
                {"percentage": 12},
                {"key": "07600", "percentage": 4.5}
            ]}
        })))
        .unwrap();
        assert_eq!(
            parsed["s1"],
            vec![
                RegionShare {
                    key: "08100".to_string(),
                    percentage: 61.0
                },
                RegionShare {
                    key: "07600".to_string(),
                    percentage: 4.5
                },
            ]
        );
    }

    #[test]
    fn test_name_maps_drop_non_strings() {
        let names = parse_journey_names(&body(json!({"j1": "Early Scots", "j2": 3}))).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names["j1"], "Early Scots");

        let sub = parse_subjourney_names(&body(json!({
            "j1": {"c1": "Glasgow", "c2": null},
            "j2": "flat"
        })))
        .unwrap();
        assert_eq!(sub["j1"].len(), 1);
        assert!(sub["j2"].is_empty());
    }

    #[test]
    fn test_tests_and_cluster() {
        let tests = parse_tests(&body(json!({"dnaSamplesData": [
            {"subjectName": "Ada", "testGuid": "G1"},
            {"subjectName": "Nobody"}
        ]})))
        .unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].test_guid, "G1");

        let code = parse_paternal_cluster(&body(json!({"item": {"clusterCode": "p2"}}))).unwrap();
        assert_eq!(code.as_deref(), Some("p2"));
        let code = parse_paternal_cluster(&body(json!({"item": {"clusterCode": "x"}}))).unwrap();
        assert_eq!(code, None);
    }

    #[test]
    fn test_journey_options_collects_ids() {
        let ids = parse_journey_options(&body(json!({
            "west": [{"communityId": "j2"}, {"communityId": "j1"}],
            "east": [{"communityId": "j1"}],
            "meta": 5
        })))
        .unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["j1", "j2"]);
    }
}
