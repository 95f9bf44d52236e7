//! npms.io search API client
//!
//! Issues the single search request per cache miss and hands the raw body back
//! to the caller for decoding.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;

use super::SearchError;

/// Search endpoint of the npms.io API
pub const NPMS_SEARCH_URL: &str = "https://api.npms.io/v2/search";

/// Fetches raw search responses
///
/// Implementations make one attempt per call. A non-success response is an
/// error that carries the endpoint's body.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Requests up to `size` results for `query` and returns the response body
    async fn fetch(&self, query: &str, size: usize) -> Result<String, SearchError>;
}

/// Client for the npms.io search endpoint
#[derive(Debug, Clone)]
pub struct NpmsClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Search endpoint (allows override for testing)
    base_url: String,
}

impl Default for NpmsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NpmsClient {
    /// Creates a client for the public npms.io endpoint
    pub fn new() -> Self {
        Self::with_base_url(NPMS_SEARCH_URL)
    }

    /// Creates a client for a different search endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Creates a client with a custom HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SearchTransport for NpmsClient {
    async fn fetch(&self, query: &str, size: usize) -> Result<String, SearchError> {
        let size = size.to_string();
        tracing::debug!(url = %self.base_url, query, size = %size, "Requesting search results");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("q", query), ("size", size.as_str())])
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SearchError::Endpoint { status, body });
        }
        Ok(body)
    }
}
