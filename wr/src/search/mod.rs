//! Web search module
//!
//! A `SearchClient` trait over the search service, the Tavily
//! implementation, and the helpers that turn results into model input and
//! citation lines.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

mod error;
pub mod format;
mod tavily;
mod types;

pub use error::SearchError;
pub use format::{deduplicate_and_format_sources, format_sources};
pub use tavily::TavilyClient;
pub use types::{SearchRequest, SearchResponse, SearchResult};

use crate::config::SearchConfig;

/// Web search service
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run one search and return the results in ranking order
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

/// Create a search client based on the provider in config
pub fn create_search_client(config: &SearchConfig) -> Result<Arc<dyn SearchClient>, SearchError> {
    debug!(provider = %config.provider, "create_search_client: called");
    match config.provider.as_str() {
        "tavily" => {
            debug!("create_search_client: creating Tavily client");
            Ok(Arc::new(TavilyClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_search_client: unknown provider");
            Err(SearchError::Config(format!(
                "Unknown search provider: '{}'. Supported: tavily",
                other
            )))
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock search client for unit tests
    ///
    /// Serves scripted responses in order; once they run out it synthesizes
    /// one result per call from the query so loops of any length work.
    pub struct MockSearchClient {
        responses: Vec<SearchResponse>,
        call_count: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl MockSearchClient {
        pub fn new(responses: Vec<SearchResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockSearchClient::new: called");
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        /// A mock that answers every query with one synthesized result
        pub fn echo() -> Self {
            Self::new(vec![])
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Queries received so far, in call order
        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().map(|q| q.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl SearchClient for MockSearchClient {
        async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            debug!(query = %request.query, "MockSearchClient::search: called");
            if let Ok(mut queries) = self.queries.lock() {
                queries.push(request.query.clone());
            }
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(response) = self.responses.get(idx) {
                return Ok(response.clone());
            }
            Ok(SearchResponse {
                results: vec![SearchResult {
                    title: format!("Result {}", idx + 1),
                    url: format!("https://example.com/{}", idx + 1),
                    content: format!("About {}", request.query),
                    raw_content: Some(format!("Full page about {}", request.query)),
                }],
            })
        }
    }

    /// Search client that always fails
    pub struct FailingSearchClient;

    #[async_trait]
    impl SearchClient for FailingSearchClient {
        async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            Err(SearchError::ApiError {
                status: 401,
                message: "invalid api key".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockSearchClient;
    use super::*;

    #[tokio::test]
    async fn test_mock_search_synthesizes_results() {
        let client = MockSearchClient::echo();
        let response = client.search(&SearchRequest::new("rust", 1, true)).await.unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].url, "https://example.com/1");
        assert_eq!(client.queries(), vec!["rust".to_string()]);
    }

    #[test]
    fn test_create_search_client_unknown_provider() {
        let config = SearchConfig {
            provider: "altavista".to_string(),
            ..Default::default()
        };
        let err = create_search_client(&config).err().unwrap();
        assert!(err.to_string().contains("altavista"));
    }
}
