//! ResearchEngine - drives a topic through query, search, summary and reflection

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::finalize::finalize_summary;
use super::query::generate_query;
use super::reflect::reflect;
use super::summarize::summarize;
use super::{Phase, ResearchError, ResearchEvent, ResearchState};
use crate::config::ResearchConfig;
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;
use crate::search::{SearchClient, SearchRequest, deduplicate_and_format_sources, format_sources};

/// Default response budget for each model call
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Research loop execution engine
///
/// Holds only injected clients and settings; every run owns its own
/// `ResearchState`, so one engine can serve concurrent runs.
pub struct ResearchEngine {
    /// Loop configuration
    config: ResearchConfig,

    /// Free-text model (summaries)
    llm: Arc<dyn LlmClient>,

    /// JSON-mode model (queries, reflection)
    llm_json: Arc<dyn LlmClient>,

    /// Web search service
    search: Arc<dyn SearchClient>,

    /// Prompt templates
    prompts: PromptLoader,

    /// Optional progress sink
    events: Option<mpsc::UnboundedSender<ResearchEvent>>,

    /// Response budget per model call
    max_tokens: u32,
}

impl ResearchEngine {
    /// Create an engine using the embedded prompt templates
    pub fn new(
        config: ResearchConfig,
        llm: Arc<dyn LlmClient>,
        llm_json: Arc<dyn LlmClient>,
        search: Arc<dyn SearchClient>,
    ) -> Self {
        debug!(?config, text_model = %llm.model(), json_model = %llm_json.model(), "ResearchEngine::new: called");
        Self {
            config,
            llm,
            llm_json,
            search,
            prompts: PromptLoader::embedded_only(),
            events: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Load prompt templates with overrides from `workdir`
    pub fn with_prompts_from(mut self, workdir: impl AsRef<Path>) -> Self {
        self.prompts = PromptLoader::new(workdir);
        self
    }

    /// Publish progress events on `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ResearchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Set the response budget per model call
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Research `topic` and return the final summary with its sources
    pub async fn run(&self, topic: &str) -> Result<String, ResearchError> {
        let state = self.run_to_state(topic).await?;
        Ok(state.running_summary.unwrap_or_default())
    }

    /// Research `topic` and return the whole final state
    ///
    /// Fails with `EmptyTopic` before any external call when the topic is
    /// blank, and with `Timeout` when the configured run budget runs out.
    pub async fn run_to_state(&self, topic: &str) -> Result<ResearchState, ResearchError> {
        if topic.trim().is_empty() {
            debug!("run_to_state: empty topic");
            return Err(ResearchError::EmptyTopic);
        }

        let run_id = Uuid::now_v7();
        let span = info_span!("research", %run_id);
        let run = self.drive(topic).instrument(span);

        match self.config.run_timeout() {
            Some(limit) => {
                debug!(?limit, "run_to_state: running with time limit");
                tokio::time::timeout(limit, run)
                    .await
                    .map_err(|_| ResearchError::Timeout(limit))?
            }
            None => run.await,
        }
    }

    async fn drive(&self, topic: &str) -> Result<ResearchState, ResearchError> {
        info!(
            "Starting research on '{}' (max_web_search_loops: {})",
            topic, self.config.max_web_search_loops
        );

        let mut state = ResearchState::new(topic);
        let mut phase = Phase::GeneratingQuery;
        while !phase.is_terminal() {
            let (next_state, next_phase) = self.step(phase, state).await?;
            state = next_state;
            phase = next_phase;
        }

        info!(
            "Research finished after {} searches ({} source blocks)",
            state.research_loop_count,
            state.sources_gathered.len()
        );
        Ok(state)
    }

    /// Do the work of `phase` and return the updated state with the next phase
    ///
    /// Entering `Finalized` from `Reflecting` also assembles the final
    /// document. Stepping a finalized state is a no-op.
    pub async fn step(&self, phase: Phase, mut state: ResearchState) -> Result<(ResearchState, Phase), ResearchError> {
        debug!(%phase, loop_count = state.research_loop_count, "step: called");
        match phase {
            Phase::GeneratingQuery => {
                let generated = generate_query(
                    self.llm_json.as_ref(),
                    &self.prompts,
                    &state.research_topic,
                    self.max_tokens,
                )
                .await?;
                self.emit(ResearchEvent::QueryGenerated {
                    query: generated.query.clone(),
                    fallback: generated.fallback,
                });
                state.search_query = generated.query;
            }
            Phase::Searching => {
                let request = SearchRequest::new(
                    &state.search_query,
                    self.config.max_results,
                    self.config.fetch_full_page,
                );
                let response = self.search.search(&request).await?;
                if response.is_empty() {
                    debug!(query = %state.search_query, "step: search returned no results");
                }
                let results = deduplicate_and_format_sources(
                    &response,
                    self.config.max_tokens_per_source,
                    self.config.fetch_full_page,
                );
                let sources = format_sources(&response);
                state.record_search(results, sources);
                info!(
                    "Search {} done for '{}' ({} results)",
                    state.research_loop_count,
                    state.search_query,
                    response.results.len()
                );
                self.emit(ResearchEvent::SearchCompleted {
                    loop_count: state.research_loop_count,
                    query: state.search_query.clone(),
                    result_count: response.results.len(),
                });
            }
            Phase::Summarizing => {
                let latest = state.latest_results().unwrap_or_default();
                let summary = summarize(
                    self.llm.as_ref(),
                    &self.prompts,
                    &state.research_topic,
                    state.existing_summary(),
                    latest,
                    self.max_tokens,
                )
                .await?;
                self.emit(ResearchEvent::SummaryUpdated {
                    loop_count: state.research_loop_count,
                    summary_len: summary.len(),
                });
                state.running_summary = Some(summary);
            }
            Phase::Reflecting => {
                let reflection = reflect(
                    self.llm_json.as_ref(),
                    &self.prompts,
                    &state.research_topic,
                    state.running_summary.as_deref().unwrap_or_default(),
                    self.max_tokens,
                )
                .await?;
                info!(
                    "loop number {}: query: {}",
                    state.research_loop_count, reflection.follow_up_query
                );
                self.emit(ResearchEvent::Reflected {
                    loop_count: state.research_loop_count,
                    knowledge_gap: reflection.knowledge_gap,
                    follow_up_query: reflection.follow_up_query.clone(),
                    fallback: reflection.fallback,
                });
                state.search_query = reflection.follow_up_query;
            }
            Phase::Finalized => {
                debug!("step: already finalized");
                return Ok((state, Phase::Finalized));
            }
        }

        let next = phase.next(state.research_loop_count, self.config.max_web_search_loops);
        if next == Phase::Finalized {
            let summary = state.running_summary.as_deref().unwrap_or_default();
            let document = finalize_summary(summary, &state.sources_gathered);
            state.running_summary = Some(document);
            self.emit(ResearchEvent::Finalized {
                loop_count: state.research_loop_count,
                source_count: state.sources_gathered.len(),
            });
        }
        debug!(%phase, %next, "step: transition");
        Ok((state, next))
    }

    fn emit(&self, event: ResearchEvent) {
        if let Some(tx) = &self.events {
            // Receiver may be gone; progress is best effort
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::search::mock::{FailingSearchClient, MockSearchClient};
    use crate::search::{SearchError, SearchResponse, SearchResult};
    use async_trait::async_trait;
    use std::time::Duration;

    fn config(max_web_search_loops: u32) -> ResearchConfig {
        ResearchConfig {
            max_web_search_loops,
            ..Default::default()
        }
    }

    fn json_mock(reflections: usize) -> MockLlmClient {
        let mut texts = vec![r#"{"query": "first query", "aspect": "a", "rationale": "r"}"#.to_string()];
        for n in 1..=reflections {
            texts.push(format!(
                r#"{{"knowledge_gap": "gap {}", "follow_up_query": "follow up {}"}}"#,
                n, n
            ));
        }
        MockLlmClient::with_texts(texts)
    }

    #[tokio::test]
    async fn test_run_test_topic_with_one_loop() {
        let llm = Arc::new(MockLlmClient::with_texts([
            "<think>draft</think>Summary one",
            "Summary two",
        ]));
        let llm_json = Arc::new(json_mock(2));
        let search = Arc::new(MockSearchClient::echo());
        let engine = ResearchEngine::new(config(1), llm.clone(), llm_json.clone(), search.clone());

        let state = engine.run_to_state("Test Topic").await.unwrap();

        assert_eq!(state.research_loop_count, 2);
        assert_eq!(state.web_research_results.len(), 2);
        assert_eq!(state.sources_gathered.len(), 2);
        assert_eq!(search.queries(), vec!["first query".to_string(), "follow up 1".to_string()]);
        assert_eq!(llm.call_count(), 2);
        assert_eq!(llm_json.call_count(), 3);

        let output = state.running_summary.unwrap();
        assert_eq!(
            output,
            "## Summary\n\nSummary two\n\n ### Sources:\n\
             * Result 1 : https://example.com/1\n\
             * Result 2 : https://example.com/2"
        );
        assert_eq!(output.matches("* Result").count(), 2);
    }

    #[tokio::test]
    async fn test_second_summary_extends_first() {
        let llm = Arc::new(MockLlmClient::with_texts(["Summary one", "Summary two"]));
        let engine = ResearchEngine::new(
            config(1),
            llm.clone(),
            Arc::new(json_mock(2)),
            Arc::new(MockSearchClient::echo()),
        );

        engine.run("Test Topic").await.unwrap();

        let requests = llm.requests();
        let first = requests[0].last_user_text().unwrap();
        let second = requests[1].last_user_text().unwrap();
        assert!(first.contains("<Search Results>"));
        assert!(!first.contains("<Existing Summary>"));
        assert!(second.contains("<Existing Summary> \n Summary one \n <Existing Summary>"));
        assert!(second.contains("About follow up 1"));
    }

    #[tokio::test]
    async fn test_zero_loops_searches_once() {
        let engine = ResearchEngine::new(
            config(0),
            Arc::new(MockLlmClient::with_texts(["Only summary"])),
            Arc::new(json_mock(1)),
            Arc::new(MockSearchClient::echo()),
        );

        let state = engine.run_to_state("Rust").await.unwrap();
        assert_eq!(state.research_loop_count, 1);
        assert!(state.running_summary.unwrap().starts_with("## Summary\n\nOnly summary"));
    }

    #[tokio::test]
    async fn test_fallbacks_keep_the_loop_going() {
        let llm_json = Arc::new(MockLlmClient::with_texts(["not json", "{}"]));
        let search = Arc::new(MockSearchClient::echo());
        let engine = ResearchEngine::new(
            config(1),
            Arc::new(MockLlmClient::with_texts(["One", "Two"])),
            llm_json.clone(),
            search.clone(),
        );

        // Second reflection is past the scripted answers and fails the run,
        // so stop after the first loop instead
        let state = ResearchState::new("Test Topic");
        let (state, phase) = engine.step(Phase::GeneratingQuery, state).await.unwrap();
        assert_eq!(phase, Phase::Searching);
        assert_eq!(state.search_query, "Test Topic");

        let (state, _) = engine.step(Phase::Searching, state).await.unwrap();
        let (state, _) = engine.step(Phase::Summarizing, state).await.unwrap();
        let (state, phase) = engine.step(Phase::Reflecting, state).await.unwrap();
        assert_eq!(phase, Phase::Searching);
        assert_eq!(state.search_query, "Tell me more about Test Topic");
    }

    #[tokio::test]
    async fn test_empty_topic_rejected_before_any_call() {
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let search = Arc::new(MockSearchClient::echo());
        let engine = ResearchEngine::new(config(3), llm.clone(), llm.clone(), search.clone());

        let result = engine.run("   ").await;
        assert!(matches!(result, Err(ResearchError::EmptyTopic)));
        assert_eq!(llm.call_count(), 0);
        assert_eq!(search.call_count(), 0);
    }

    #[tokio::test]
    async fn test_search_failure_aborts_run() {
        let engine = ResearchEngine::new(
            config(3),
            Arc::new(MockLlmClient::with_texts(["S"])),
            Arc::new(json_mock(3)),
            Arc::new(FailingSearchClient),
        );

        let result = engine.run("Rust").await;
        assert!(matches!(result, Err(ResearchError::Search(_))));
    }

    #[tokio::test]
    async fn test_duplicate_urls_collapse_in_results() {
        let duplicate = SearchResult {
            title: "Same".to_string(),
            url: "https://same.example".to_string(),
            content: "c".to_string(),
            raw_content: None,
        };
        let search = Arc::new(MockSearchClient::new(vec![SearchResponse {
            results: vec![duplicate.clone(), duplicate],
        }]));
        let engine = ResearchEngine::new(
            config(0),
            Arc::new(MockLlmClient::with_texts(["S"])),
            Arc::new(json_mock(1)),
            search,
        );

        let state = engine.run_to_state("Rust").await.unwrap();
        assert_eq!(state.web_research_results[0].matches("Source Same:").count(), 1);
        // Citations are not deduplicated
        assert_eq!(state.sources_gathered[0].matches("* Same").count(), 2);
    }

    #[tokio::test]
    async fn test_events_follow_the_run() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = ResearchEngine::new(
            config(1),
            Arc::new(MockLlmClient::with_texts(["One", "Two"])),
            Arc::new(json_mock(2)),
            Arc::new(MockSearchClient::echo()),
        )
        .with_events(tx);

        engine.run("Test Topic").await.unwrap();
        drop(engine);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events.first(),
            Some(&ResearchEvent::QueryGenerated {
                query: "first query".to_string(),
                fallback: false
            })
        );
        assert_eq!(
            events.last(),
            Some(&ResearchEvent::Finalized {
                loop_count: 2,
                source_count: 2
            })
        );
        let searches = events
            .iter()
            .filter(|e| matches!(e, ResearchEvent::SearchCompleted { .. }))
            .count();
        assert_eq!(searches, 2);
    }

    #[tokio::test]
    async fn test_events_survive_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let engine = ResearchEngine::new(
            config(0),
            Arc::new(MockLlmClient::with_texts(["One"])),
            Arc::new(json_mock(1)),
            Arc::new(MockSearchClient::echo()),
        )
        .with_events(tx);

        assert!(engine.run("Rust").await.is_ok());
    }

    struct StalledSearchClient;

    #[async_trait]
    impl SearchClient for StalledSearchClient {
        async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(SearchResponse::default())
        }
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let config = ResearchConfig {
            run_timeout_ms: Some(50),
            ..Default::default()
        };
        let engine = ResearchEngine::new(
            config,
            Arc::new(MockLlmClient::with_texts(["S"])),
            Arc::new(json_mock(1)),
            Arc::new(StalledSearchClient),
        );

        let result = engine.run("Rust").await;
        assert!(matches!(result, Err(ResearchError::Timeout(d)) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_concurrent_runs_share_engine() {
        let json = r#"{"query": "q", "knowledge_gap": "g", "follow_up_query": "f"}"#;
        let engine = ResearchEngine::new(
            config(0),
            Arc::new(MockLlmClient::with_texts(vec!["Same"; 2])),
            Arc::new(MockLlmClient::with_texts(vec![json; 4])),
            Arc::new(MockSearchClient::echo()),
        );

        let (a, b) = tokio::join!(engine.run("Alpha"), engine.run("Beta"));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.starts_with("## Summary\n\nSame"));
        assert!(b.starts_with("## Summary\n\nSame"));
        assert_eq!(a.matches("* Result").count(), 1);
        assert_eq!(b.matches("* Result").count(), 1);
    }

    #[tokio::test]
    async fn test_step_on_finalized_is_noop() {
        let engine = ResearchEngine::new(
            config(0),
            Arc::new(MockLlmClient::new(vec![])),
            Arc::new(MockLlmClient::new(vec![])),
            Arc::new(MockSearchClient::echo()),
        );
        let mut state = ResearchState::new("Rust");
        state.running_summary = Some("done".to_string());

        let (after, phase) = engine.step(Phase::Finalized, state.clone()).await.unwrap();
        assert_eq!(phase, Phase::Finalized);
        assert_eq!(after, state);
    }
}
