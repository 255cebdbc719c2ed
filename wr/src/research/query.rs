//! Initial search query generation

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ResearchError;
use super::markup::parse_json_object;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::{PromptContext, PromptLoader};

/// Human turn sent with the query writer prompt
pub const QUERY_REQUEST: &str = "Generate query for web search";

/// The query writer's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    pub query: String,
    pub aspect: Option<String>,
    pub rationale: Option<String>,
    /// True when the model's answer was unusable and the topic was used
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
struct QueryJson {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    aspect: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Ask the model for a first search query on `topic`
///
/// Unparseable output or a missing/blank `query` falls back to the topic
/// itself. Transport failures propagate.
pub async fn generate_query(
    llm: &dyn LlmClient,
    prompts: &PromptLoader,
    topic: &str,
    max_tokens: u32,
) -> Result<GeneratedQuery, ResearchError> {
    debug!(%topic, model = %llm.model(), "generate_query: called");
    let system_prompt = prompts.render("query_writer", &PromptContext::new(topic))?;
    let response = llm
        .complete(CompletionRequest::json(system_prompt, QUERY_REQUEST, max_tokens))
        .await?;

    let generated = parse_query(response.text(), topic);
    if generated.fallback {
        warn!(%topic, raw = %response.text(), "generate_query: unusable answer, searching for the topic itself");
    } else {
        info!(query = %generated.query, output_tokens = response.usage.output_tokens, "Generated search query");
    }
    Ok(generated)
}

fn parse_query(raw: &str, topic: &str) -> GeneratedQuery {
    let parsed: Option<QueryJson> = parse_json_object(raw);
    match parsed {
        Some(QueryJson {
            query: Some(query),
            aspect,
            rationale,
        }) if !query.trim().is_empty() => {
            debug!("parse_query: model query accepted");
            GeneratedQuery {
                query: query.trim().to_string(),
                aspect,
                rationale,
                fallback: false,
            }
        }
        _ => {
            debug!("parse_query: falling back to topic");
            GeneratedQuery {
                query: topic.to_string(),
                aspect: None,
                rationale: None,
                fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ResponseFormat;
    use crate::llm::client::mock::MockLlmClient;

    #[tokio::test]
    async fn test_generate_query_uses_model_answer() {
        let llm = MockLlmClient::with_texts([
            r#"{"query": "rust borrow checker", "aspect": "memory safety", "rationale": "core concept"}"#,
        ]);
        let prompts = PromptLoader::embedded_only();

        let generated = generate_query(&llm, &prompts, "Rust", 512).await.unwrap();

        assert_eq!(generated.query, "rust borrow checker");
        assert_eq!(generated.aspect.as_deref(), Some("memory safety"));
        assert!(!generated.fallback);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].format, ResponseFormat::Json);
        assert_eq!(requests[0].last_user_text(), Some(QUERY_REQUEST));
        assert!(requests[0].system_prompt.contains("<TOPIC>\nRust\n</TOPIC>"));
    }

    #[tokio::test]
    async fn test_generate_query_falls_back_on_bad_json() {
        let llm = MockLlmClient::with_texts(["I think you should search for rust"]);
        let prompts = PromptLoader::embedded_only();

        let generated = generate_query(&llm, &prompts, "Rust", 512).await.unwrap();
        assert_eq!(generated.query, "Rust");
        assert!(generated.fallback);
    }

    #[tokio::test]
    async fn test_generate_query_propagates_llm_failure() {
        let llm = MockLlmClient::new(vec![]);
        let prompts = PromptLoader::embedded_only();

        let result = generate_query(&llm, &prompts, "Rust", 512).await;
        assert!(matches!(result, Err(ResearchError::Llm(_))));
    }

    #[test]
    fn test_parse_query_missing_or_blank_key() {
        assert!(parse_query(r#"{"aspect": "x"}"#, "T").fallback);
        assert!(parse_query(r#"{"query": "   "}"#, "T").fallback);
        assert!(parse_query(r#"{"query": 42}"#, "T").fallback);
    }

    #[test]
    fn test_parse_query_strips_thinking() {
        let generated = parse_query("<think>{\"query\": \"wrong\"}</think>{\"query\": \"right\"}", "T");
        assert_eq!(generated.query, "right");
    }
}
