//! Match records and their enrichment.
//!
//! K_i: A record is identified by its `sampleId`; everything else the list
//! endpoint returns is carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category share attached to a record by the ethnicity lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionShare {
    /// Region key, e.g. "08100"
    pub key: String,
    /// Share in percent
    pub percentage: f64,
}

/// Enrichment fields computed for one record in one batch.
///
/// K_i: Applied as a unit; a record never carries half of an enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub journeys: Vec<String>,
    pub journey_names: Vec<String>,
    pub subjourneys: Vec<String>,
    pub regions: Vec<RegionShare>,
}

/// One fetched match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier
    #[serde(rename = "sampleId")]
    pub sample_id: String,

    /// Journey identifiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journeys: Option<Vec<String>>,

    /// Journey display names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey_names: Option<Vec<String>>,

    /// Sub-journey display names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjourneys: Option<Vec<String>>,

    /// Region shares
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<RegionShare>>,

    /// Opaque source fields
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Record {
    /// Create an un-enriched record.
    pub fn new(sample_id: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            sample_id: sample_id.into(),
            journeys: None,
            journey_names: None,
            subjourneys: None,
            regions: None,
            payload,
        }
    }

    /// Build a record from a list-endpoint item.
    ///
    /// B_i(item carries a string sampleId) → Option
    pub fn from_list_item(item: Value) -> Option<Self> {
        let Value::Object(mut payload) = item else {
            return None;
        };
        let sample_id = match payload.remove("sampleId") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => return None,
        };
        Some(Self::new(sample_id, payload))
    }

    /// Replace all enrichment fields at once.
    pub fn apply(&mut self, enrichment: Enrichment) {
        self.journeys = Some(enrichment.journeys);
        self.journey_names = Some(enrichment.journey_names);
        self.subjourneys = Some(enrichment.subjourneys);
        self.regions = Some(enrichment.regions);
    }

    /// Whether every enrichment field is populated.
    pub fn is_enriched(&self) -> bool {
        self.journeys.is_some()
            && self.journey_names.is_some()
            && self.subjourneys.is_some()
            && self.regions.is_some()
    }

    /// Display name under `matchProfile.displayName`.
    pub fn display_name(&self) -> Option<&str> {
        self.payload
            .get("matchProfile")?
            .get("displayName")?
            .as_str()
    }

    /// Shared centimorgans, from `relationship.sharedCentimorgans` or `cM`.
    pub fn shared_centimorgans(&self) -> Option<String> {
        let value = self
            .payload
            .get("relationship")
            .and_then(|rel| rel.get("sharedCentimorgans"))
            .filter(|v| !v.is_null())
            .or_else(|| self.payload.get("cM").filter(|v| !v.is_null()))?;
        match value {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Cluster code (`p1`, `p2`, `both`, `no_call`).
    pub fn cluster_code(&self) -> Option<&str> {
        self.payload.get("matchClusterCode")?.as_str()
    }
}
