//! Tavily Search - web search over the Tavily JSON API
//!
//! Transient failures (timeouts, connection errors, 429, 5xx) are retried
//! with exponential backoff inside the provider. Callers see either results
//! or the final error.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{SearchCapability, SearchHit, SearchResults};
use crate::error::SearchError;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Default timeout for Tavily API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Tavily rejects longer queries
const MAX_QUERY_CHARS: usize = 400;

/// Search depth for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

/// Tavily-backed search capability
pub struct TavilySearch {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    max_results: usize,
    search_depth: SearchDepth,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_results: 5,
            search_depth: SearchDepth::default(),
        }
    }

    /// Point at a different API host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, 20);
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    fn build_request(&self, query: &str) -> TavilyRequest {
        TavilyRequest {
            query: query.chars().take(MAX_QUERY_CHARS).collect(),
            max_results: self.max_results as u32,
            search_depth: self.search_depth,
            include_answer: false,
        }
    }

    async fn execute_with_retry(&self, request: &TavilyRequest) -> Result<TavilyResponse, SearchError> {
        let mut attempt = 0;
        loop {
            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.pow(attempt);
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Tavily request failed, will retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_single_request(&self, request: &TavilyRequest) -> Result<TavilyResponse, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(SearchError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| SearchError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(SearchError::from_status(status.as_u16(), error_text))
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest {
    query: String,
    max_results: u32,
    search_depth: SearchDepth,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    score: f64,
}

#[async_trait]
impl SearchCapability for TavilySearch {
    async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        debug!(query = %query, "Executing tavily search");

        let request = self.build_request(query);
        let response = self.execute_with_retry(&request).await?;

        let hits = response
            .results
            .into_iter()
            .map(|r| SearchHit::new(r.title, r.url, r.content).with_score(r.score))
            .collect();

        Ok(SearchResults::new(query, hits))
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
