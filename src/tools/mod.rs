//! Web search capabilities
//!
//! Workers see search through [`SearchCapability`] only. Providers own their
//! retry policy; a failure that survives it is returned to the worker, which
//! records it as a degraded observation.

mod duckduckgo;
mod tavily;

pub use duckduckgo::DuckDuckGoSearch;
pub use tavily::{SearchDepth, TavilySearch};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::SearchError;

/// A single ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    /// Relevance score (0.0 to 1.0) when the provider reports one
    pub score: Option<f64>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score.clamp(0.0, 1.0));
        self
    }

    /// Host part of the URL, used to count independent sources.
    ///
    /// Userinfo and port are dropped, so `https://user@who.int:443/x`
    /// and `https://who.int/y` share the host `who.int`.
    pub fn host(&self) -> Option<&str> {
        let authority = self.url.split_once("://")?.1.split(['/', '?', '#']).next()?;
        let host_port = authority.rsplit('@').next()?;
        let host = match host_port.strip_prefix('[') {
            Some(bracketed) => bracketed.split(']').next()?,
            None => host_port.split(':').next()?,
        };
        (!host.is_empty()).then_some(host)
    }
}

/// Ranked results for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn new(query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        Self {
            query: query.into(),
            hits,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Render as the observation text a worker records
    pub fn to_observation(&self) -> String {
        if self.hits.is_empty() {
            return format!("No results found for: {}", self.query);
        }

        let mut output = format!("## Search Results for: \"{}\"\n\n", self.query);
        for (i, hit) in self.hits.iter().enumerate() {
            output.push_str(&format!("{}. **{}**\n   URL: {}\n", i + 1, hit.title, hit.url));
            if let Some(score) = hit.score {
                output.push_str(&format!("   Relevance: {:.0}%\n", score * 100.0));
            }
            output.push_str(&format!("   {}\n\n", hit.content));
        }
        output
    }
}

/// Query-in, ranked-snippets-out search capability
#[async_trait]
pub trait SearchCapability: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResults, SearchError>;

    fn name(&self) -> &str;
}

/// Pick the configured provider: Tavily when a key is present, DuckDuckGo otherwise
pub fn search_from_config(config: &Config) -> Arc<dyn SearchCapability> {
    match &config.tavily_api_key {
        Some(key) => Arc::new(
            TavilySearch::new(key.clone())
                .with_max_results(config.max_search_results)
                .with_search_depth(SearchDepth::Advanced),
        ),
        None => Arc::new(DuckDuckGoSearch::new(config.max_search_results)),
    }
}
