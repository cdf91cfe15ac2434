//! DuckDuckGo search through the keyless HTML endpoint
//!
//! DuckDuckGo has no free JSON web-search API, so result blocks are read out
//! of the HTML page. Each `result__body` block yields a title, the target URL
//! (from the `uddg=` redirect parameter) and the snippet text.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{SearchCapability, SearchHit, SearchResults};
use crate::error::SearchError;

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Keyless web search
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(max_results: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: max_results.max(1),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn parse_html(&self, html: &str) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        let mut seen = HashSet::new();

        for block in html.split("result__body").skip(1) {
            if hits.len() >= self.max_results {
                break;
            }

            let Some(url) = redirect_target(block) else {
                continue;
            };
            if url.contains("duckduckgo.com") || !seen.insert(url.clone()) {
                continue;
            }

            let title = element_text(block, "result__a")
                .or_else(|| extract_domain(&url))
                .unwrap_or_else(|| "Result".to_string());
            let snippet = element_text(block, "result__snippet").unwrap_or_default();

            hits.push(SearchHit::new(title, url, snippet));
        }

        hits
    }
}

/// Decode the target URL out of a DuckDuckGo `uddg=` redirect link
fn redirect_target(block: &str) -> Option<String> {
    let start = block.find("uddg=")? + "uddg=".len();
    let rest = &block[start..];
    let end = rest.find(['&', '"', '\''])?;
    let url = urlencoding::decode(&rest[..end]).ok()?.into_owned();
    url.starts_with("http").then_some(url)
}

/// Text content of the first element carrying `class_name`
fn element_text(block: &str, class_name: &str) -> Option<String> {
    let marker = format!("class=\"{}\"", class_name);
    let start = block.find(&marker)?;
    let after_tag = &block[start..];
    let content_start = after_tag.find('>')? + 1;
    let content = &after_tag[content_start..];
    let end = content.find("</a>").or_else(|| content.find("</"))?;
    let text = decode_entities(&strip_tags(&content[..end]));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn extract_domain(url: &str) -> Option<String> {
    url.split("//").nth(1)?.split('/').next().map(|s| s.to_string())
}

#[async_trait]
impl SearchCapability for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(SearchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::from_status(status.as_u16(), body));
        }

        let body = response.text().await.map_err(SearchError::from_reqwest)?;
        let hits = self.parse_html(&body);

        if hits.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = hits.len(), "Search completed");
        }

        Ok(SearchResults::new(query, hits))
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}
