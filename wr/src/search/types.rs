//! Search request/response types

use serde::{Deserialize, Serialize};

/// A single web search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
    /// Ask for the full page text in addition to the snippet
    pub include_raw_content: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: u32, include_raw_content: bool) -> Self {
        Self {
            query: query.into(),
            max_results,
            include_raw_content,
        }
    }
}

/// One result returned by the search service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Most relevant snippet
    pub content: String,
    /// Full page text, when requested and available
    #[serde(default)]
    pub raw_content: Option<String>,
}

/// Results for one search, in service ranking order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
