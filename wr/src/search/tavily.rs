//! Tavily search API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{SearchClient, SearchError, SearchRequest, SearchResponse, SearchResult};
use crate::config::SearchConfig;
use crate::transport::post_json;

/// Tavily search client
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self, SearchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Create a client from config, reading the API key from the environment
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        debug!(base_url = %config.base_url, "TavilyClient::from_config: called");
        let api_key = config.get_api_key().map_err(|e| SearchError::Config(e.to_string()))?;
        Self::new(api_key, &config.base_url, config.timeout())
    }

    fn build_request_body(&self, request: &SearchRequest) -> serde_json::Value {
        debug!(query = %request.query, max_results = request.max_results, "build_request_body: called");
        serde_json::json!({
            "api_key": self.api_key,
            "query": request.query,
            "max_results": request.max_results,
            "search_depth": "basic",
            "include_raw_content": request.include_raw_content,
        })
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        debug!(query = %request.query, "TavilyClient::search: called");
        let url = format!("{}/search", self.base_url);
        let body = self.build_request_body(request);

        let response = post_json(&self.http, &url, None, &body).await?;
        let api_response: TavilyResponse = response.json().await?;
        let results: Vec<SearchResult> = api_response.results.into_iter().map(SearchResult::from).collect();
        debug!(result_count = results.len(), "TavilyClient::search: success");
        Ok(SearchResponse { results })
    }
}

// Tavily API response types

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}

impl From<TavilyResult> for SearchResult {
    fn from(r: TavilyResult) -> Self {
        Self {
            title: r.title,
            url: r.url,
            content: r.content,
            raw_content: r.raw_content,
        }
    }
}
