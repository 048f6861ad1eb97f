//! Request signature: the parameter tuple identifying one run.
//!
//! K_i: Two runs share a checkpoint only if their signatures are equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{MatchFetchError, Result};

/// Lowest centimorgan bound the service accepts.
pub const MIN_SHARED_CM: u32 = 6;

/// Highest centimorgan bound the service accepts.
pub const MAX_SHARED_CM: u32 = 3490;

/// Target count for filters without a fixed upper bound.
///
/// Pagination relies on the short-page signal to terminate.
pub const UNBOUNDED_TARGET: u64 = 999_999;

/// Fixed match-list category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    All,
    Close,
    Distant,
}

/// Parental side filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentalSide {
    Maternal,
    Paternal,
    Both,
    Unassigned,
}

impl ParentalSide {
    /// Value sent in the `parentalSides` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maternal => "maternal",
            Self::Paternal => "paternal",
            Self::Both => "both",
            Self::Unassigned => "unassigned",
        }
    }
}

impl fmt::Display for ParentalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParentalSide {
    type Err = MatchFetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "maternal" => Ok(Self::Maternal),
            "paternal" => Ok(Self::Paternal),
            "both" => Ok(Self::Both),
            "unassigned" => Ok(Self::Unassigned),
            other => Err(MatchFetchError::InvalidInput(format!(
                "unknown parental side '{other}'"
            ))),
        }
    }
}

/// User-facing selection of which matches to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFilter {
    All,
    Close,
    Distant,
    /// Custom shared-centimorgan range; at least one bound is required.
    Custom {
        min_cm: Option<u32>,
        max_cm: Option<u32>,
    },
}

impl MatchFilter {
    /// Render the `sharedDna` range for a custom filter.
    ///
    /// Bounds are clamped into `[MIN_SHARED_CM, MAX_SHARED_CM]`.
    fn shared_dna_range(min_cm: Option<u32>, max_cm: Option<u32>) -> Result<String> {
        let clamp = |v: u32| v.clamp(MIN_SHARED_CM, MAX_SHARED_CM);
        match (min_cm.map(clamp), max_cm.map(clamp)) {
            (Some(lo), Some(hi)) => Ok(format!("{lo}-{hi}")),
            (Some(lo), None) => Ok(format!("{lo}-")),
            (None, Some(hi)) => Ok(format!("{MIN_SHARED_CM}-{hi}")),
            (None, None) => Err(MatchFetchError::InvalidInput(
                "enter at least a min or max cM value".to_string(),
            )),
        }
    }
}

/// The full set of fetch parameters for a run.
///
/// K_i: Immutable once a run starts; field-wise equality decides resumability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSignature {
    /// DNA test identifier
    pub test_guid: String,
    /// Custom centimorgan range, e.g. "90-400"
    #[serde(default)]
    pub shared_dna: Option<String>,
    /// Journey filters
    #[serde(default)]
    pub journey_ids: Vec<String>,
    /// Parental side filter
    #[serde(default)]
    pub parental_sides: Option<ParentalSide>,
    /// Fixed category; absent for custom ranges
    #[serde(default)]
    pub match_type: Option<MatchType>,
    /// Count requested by the user
    #[serde(default)]
    pub n_matches: u64,
}

impl RequestSignature {
    /// Build a signature from a user selection.
    ///
    /// Fixed filters require a positive `requested` count; custom ranges
    /// record whatever count the user entered (possibly zero).
    pub fn new(
        test_guid: impl Into<String>,
        filter: MatchFilter,
        requested: u64,
        journey_ids: Vec<String>,
        parental_sides: Option<ParentalSide>,
    ) -> Result<Self> {
        let test_guid = test_guid.into();
        if test_guid.trim().is_empty() {
            return Err(MatchFetchError::InvalidInput("no test selected".to_string()));
        }

        let (shared_dna, match_type) = match filter {
            MatchFilter::Custom { min_cm, max_cm } => {
                (Some(MatchFilter::shared_dna_range(min_cm, max_cm)?), None)
            }
            fixed => {
                if requested == 0 {
                    return Err(MatchFetchError::InvalidInput(
                        "enter a positive integer for matches".to_string(),
                    ));
                }
                let match_type = match fixed {
                    MatchFilter::Close => MatchType::Close,
                    MatchFilter::Distant => MatchType::Distant,
                    _ => MatchType::All,
                };
                (None, Some(match_type))
            }
        };

        Ok(Self {
            test_guid,
            shared_dna,
            journey_ids,
            parental_sides,
            match_type,
            n_matches: requested,
        })
    }

    /// Number of records pagination aims for.
    pub fn target_count(&self) -> u64 {
        if self.match_type.is_none() && self.shared_dna.is_some() {
            UNBOUNDED_TARGET
        } else {
            self.n_matches
        }
    }

    /// Whether the target has no fixed upper bound.
    pub fn is_unbounded(&self) -> bool {
        self.target_count() == UNBOUNDED_TARGET
    }

    /// Value of the `sharedDna` list filter, if any.
    pub fn shared_dna_param(&self) -> Option<&str> {
        match self.match_type {
            Some(MatchType::Close) => Some("closeMatches"),
            Some(MatchType::Distant) => Some("distantMatches"),
            _ => self.shared_dna.as_deref(),
        }
    }

    /// Value of the `searchCommunity` list filter, if any.
    pub fn search_community_param(&self) -> Option<String> {
        if self.journey_ids.is_empty() {
            return None;
        }
        serde_json::to_string(&self.journey_ids).ok()
    }
}
