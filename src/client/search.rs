//! Tavily web search client and result formatting.

use super::Researcher;
use crate::models::{ApiError, Result, ScriptoriumError, SearchConfig, Source};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// One search hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    /// Snippet
    #[serde(default)]
    pub content: String,
    /// Full page text, when requested and available
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub score: f64,
}

impl SearchHit {
    fn title_or_untitled(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
    }

    /// Full text when present, otherwise the snippet.
    fn body(&self) -> &str {
        self.raw_content
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.content)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
    include_raw_content: bool,
}

/// Tavily search API client.
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: u32,
    search_depth: String,
    timeout: Duration,
}

impl TavilySearch {
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ScriptoriumError::Network)?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
            search_depth: config.search_depth.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl Researcher for TavilySearch {
    async fn search(&self, topic: &str) -> Result<SearchResponse> {
        let request = SearchRequest {
            api_key: &self.api_key,
            query: topic,
            max_results: self.max_results,
            search_depth: &self.search_depth,
            include_raw_content: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScriptoriumError::Timeout(self.timeout)
                } else {
                    ScriptoriumError::Network(e)
                }
            })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(ApiError::AuthenticationFailed.into());
        }
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, message }.into());
        }

        let mut body: SearchResponse = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse search response: {e}"))
        })?;
        if body.query.is_empty() {
            body.query = topic.to_string();
        }

        debug!(query = topic, hits = body.results.len(), "Search complete");
        Ok(body)
    }
}

/// Render search hits as one prompt-ready block.
pub fn format_search_results(response: &SearchResponse) -> String {
    if response.results.is_empty() {
        return "No search results found.".to_string();
    }

    response
        .results
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "\n=== Result {}: {} ===\nURL: {}\n\n{}\n\n---\n",
                i + 1,
                hit.title_or_untitled(),
                hit.url,
                hit.body()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Attribution records for the hits.
pub fn extract_sources(response: &SearchResponse) -> Vec<Source> {
    response
        .results
        .iter()
        .map(|hit| Source {
            title: hit.title_or_untitled().to_string(),
            url: hit.url.clone(),
            score: hit.score,
        })
        .collect()
}
