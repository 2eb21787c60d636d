/// Free-text search resolution.
///
/// Turns a query like "imagine dragons believer" into an ordered list
/// of concrete media URLs. An empty list is a valid, non-error result;
/// the gateway maps it to `NotFound`.
use async_trait::async_trait;
use tracing::debug;

use mediagate_shared::errors::{GatewayError, GatewayResult};
use mediagate_shared::models::SearchCandidate;

/// Collaborator that resolves free text to candidate media URLs.
#[async_trait]
pub trait SearchResolver: Send + Sync {
    /// Ordered candidates for `query`, best match first.
    async fn search(&self, query: &str) -> GatewayResult<Vec<SearchCandidate>>;
}

/// HTTP-backed search resolver.
///
/// Expects `GET {base_url}/search?q=...` to return a JSON array of
/// `{url, title, duration_secs}` objects.
pub struct HttpSearchResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchResolver for HttpSearchResolver {
    async fn search(&self, query: &str) -> GatewayResult<Vec<SearchCandidate>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| GatewayError::DownloadFailed(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::DownloadFailed(format!(
                "search resolver returned HTTP {status}"
            )));
        }

        let candidates: Vec<SearchCandidate> = response
            .json()
            .await
            .map_err(|e| GatewayError::DownloadFailed(format!("invalid search response: {e}")))?;

        debug!("Search for {:?} returned {} candidates", query, candidates.len());
        Ok(candidates)
    }
}
