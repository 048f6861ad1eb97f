//! HTTP client for the match service.
//!
//! Epistemic foundation:
//! - K_i: Every endpoint speaks JSON and authenticates by session cookies
//! - B_i: Service will respond within timeout (might fail)
//! - B_i: Response will be valid JSON (might fail)
//! - I^B: Network availability unknowable → fail fast, resume later

use super::wire::{self, TestSummary};
use super::{Branch, Credentials, MatchPage, MatchSource, SubjourneyNames};
use crate::models::{MatchFetchError, RegionShare, RequestSignature, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Header carrying the anti-forgery token.
const CSRF_HEADER: &str = "x-csrf-token";

/// Match counts shown next to the fixed filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
    pub all: u64,
    pub close: u64,
    pub distant: u64,
}

/// A journey that can be used as a list filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyOption {
    pub id: String,
    pub name: String,
}

/// Match service API client.
///
/// Features:
/// - Cookie and CSRF headers attached to every request
/// - Typed decoding of every response at the boundary
/// - 429 surfaced as `RateLimited` with the server's retry hint
/// - Request counting
pub struct MatchClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    requests_sent: AtomicU64,
}

impl MatchClient {
    /// Create a new client.
    pub fn new(
        base_url: impl Into<String>,
        credentials: &Credentials,
        timeout_secs: Option<u64>,
        user_agent: Option<&str>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or("Mozilla/5.0"))
            .default_headers(Self::headers(credentials)?)
            .build()
            .map_err(MatchFetchError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            requests_sent: AtomicU64::new(0),
        })
    }

    /// Build headers shared by every request.
    fn headers(credentials: &Credentials) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !credentials.is_empty() {
            let mut cookie = HeaderValue::from_str(&credentials.cookie_header()).map_err(|_| {
                MatchFetchError::InvalidInput("cookie string contains invalid characters".into())
            })?;
            cookie.set_sensitive(true);
            headers.insert(COOKIE, cookie);
        }

        if let Some(token) = credentials.csrf_token() {
            let mut value = HeaderValue::from_str(token).map_err(|_| {
                MatchFetchError::InvalidInput("CSRF token contains invalid characters".into())
            })?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(CSRF_HEADER), value);
        }

        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Vec<u8>> {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MatchFetchError::Timeout(self.timeout)
            } else {
                MatchFetchError::Transport(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(60.0);
            warn!(endpoint, retry_after_secs = retry_after, "Rate limited");
            return Err(MatchFetchError::RateLimited {
                endpoint: endpoint.to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(MatchFetchError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                MatchFetchError::Timeout(self.timeout)
            } else {
                MatchFetchError::Transport(e)
            }
        })?;
        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "Response received");
        Ok(body.to_vec())
    }

    /// Batch payload: the test guid followed by the sample ids.
    fn batch_payload(test_guid: &str, sample_ids: &[String]) -> Vec<String> {
        std::iter::once(test_guid.to_string())
            .chain(sample_ids.iter().cloned())
            .collect()
    }

    /// List the DNA tests visible to the account.
    pub async fn list_tests(&self) -> Result<Vec<TestSummary>> {
        let request = self.client.get(self.url("/dna/insights/api/dnaSubnav/tests"));
        let body = self.send("dnaSubnav/tests", request).await?;
        wire::parse_tests(&body)
    }

    /// Count matches for the three fixed filters.
    pub async fn match_counts(&self, test_guid: &str) -> Result<MatchCounts> {
        let url = self.url(&format!(
            "/discoveryui-matches/parents/list/api/matchCount/{test_guid}"
        ));
        let mut counts = [0u64; 3];
        for (slot, (lower, upper)) in counts.iter_mut().zip([(0, 10), (0, 9), (10, 10)]) {
            let request = self
                .client
                .post(&url)
                .json(&serde_json::json!({ "lower": lower, "upper": upper }));
            let body = self.send("matchCount", request).await?;
            *slot = wire::parse_count(&body)?;
        }
        Ok(MatchCounts {
            all: counts[0],
            close: counts[1],
            distant: counts[2],
        })
    }

    /// Journeys available as list filters, with display names.
    ///
    /// Journeys whose name cannot be resolved are omitted.
    pub async fn journey_options(&self, test_guid: &str) -> Result<Vec<JourneyOption>> {
        let request = self.client.get(self.url(&format!(
            "/discoveryui-matches/parents/list/api/journeys/{test_guid}"
        )));
        let body = self.send("journeys", request).await?;
        let ids: Vec<String> = wire::parse_journey_options(&body)?.into_iter().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let names = self.journey_names(&ids).await?;
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                let name = names.get(&id)?.clone();
                Some(JourneyOption { id, name })
            })
            .collect())
    }

    /// The account's paternal cluster code (`p1` or `p2`).
    ///
    /// Only needed for the export's parent column; failures degrade to `None`.
    pub async fn paternal_cluster_code(&self, test_guid: &str) -> Option<String> {
        let request = self.client.get(self.url(&format!(
            "/dna/origins/inheritance/api/v1/matches/{test_guid}/paternal-cluster"
        )));
        let result = match self.send("paternal-cluster", request).await {
            Ok(body) => wire::parse_paternal_cluster(&body),
            Err(e) => Err(e),
        };
        match result {
            Ok(code) => code,
            Err(e) => {
                warn!(error = %e, "Paternal cluster lookup failed, parent column will be blank");
                None
            }
        }
    }

    /// Get total requests sent.
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }
}

impl MatchSource for MatchClient {
    async fn fetch_page(
        &self,
        signature: &RequestSignature,
        page: usize,
        page_size: usize,
    ) -> Result<MatchPage> {
        let url = self.url(&format!(
            "/discoveryui-matches/parents/list/api/matchList/{}",
            signature.test_guid
        ));
        let mut query: Vec<(&str, String)> = vec![
            ("itemsPerPage", page_size.to_string()),
            ("currentPage", page.to_string()),
        ];
        if let Some(side) = signature.parental_sides {
            query.push(("parentalSides", side.as_str().to_string()));
        }
        if let Some(shared_dna) = signature.shared_dna_param() {
            query.push(("sharedDna", shared_dna.to_string()));
        }
        if let Some(community) = signature.search_community_param() {
            query.push(("searchCommunity", community));
        }

        let request = self.client.get(url).query(&query);
        let body = self.send("matchList", request).await?;
        wire::parse_match_list(&body)
    }

    async fn batch_communities(
        &self,
        test_guid: &str,
        sample_ids: &[String],
    ) -> Result<HashMap<String, Vec<Branch>>> {
        let request = self
            .client
            .post(self.url(&format!(
                "/dna/origins/secure/compare/{test_guid}/batchCommunities"
            )))
            .json(&Self::batch_payload(test_guid, sample_ids));
        let body = self.send("batchCommunities", request).await?;
        wire::parse_communities(&body)
    }

    async fn batch_ethnicities(
        &self,
        test_guid: &str,
        sample_ids: &[String],
    ) -> Result<HashMap<String, Vec<RegionShare>>> {
        let request = self
            .client
            .put(self.url(&format!(
                "/dna/origins/secure/compare/{test_guid}/batchEthnicity"
            )))
            .json(&Self::batch_payload(test_guid, sample_ids));
        let body = self.send("batchEthnicity", request).await?;
        wire::parse_ethnicities(&body)
    }

    async fn journey_names(&self, journey_ids: &[String]) -> Result<HashMap<String, String>> {
        if journey_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let request = self
            .client
            .post(self.url("/dna/origins/branches/names"))
            .json(journey_ids);
        let body = self.send("branches/names", request).await?;
        wire::parse_journey_names(&body)
    }

    async fn subjourney_names(&self, journey_ids: &[String]) -> Result<SubjourneyNames> {
        if journey_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let request = self
            .client
            .post(self.url("/dna/origins/communities/names"))
            .json(journey_ids);
        let body = self.send("communities/names", request).await?;
        wire::parse_subjourney_names(&body)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
