//! Knowledge-gap reflection and follow-up query selection

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ResearchError;
use super::markup::parse_json_object;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::{PromptContext, PromptLoader};

/// The reflector's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflection {
    pub knowledge_gap: Option<String>,
    pub follow_up_query: String,
    /// True when the model gave no usable follow-up query
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
struct ReflectionJson {
    #[serde(default)]
    knowledge_gap: Option<String>,
    #[serde(default)]
    follow_up_query: Option<String>,
}

/// Query used when the model proposes nothing usable
pub fn fallback_query(topic: &str) -> String {
    format!("Tell me more about {}", topic)
}

/// Build the human turn for the reflector
pub fn build_reflection_message(summary: &str) -> String {
    format!(
        "Identify a knowledge gap and generate a follow-up web search query based on our existing knowledge: {}",
        summary
    )
}

/// Ask the model what the summary is missing and how to search for it
pub async fn reflect(
    llm: &dyn LlmClient,
    prompts: &PromptLoader,
    topic: &str,
    summary: &str,
    max_tokens: u32,
) -> Result<Reflection, ResearchError> {
    debug!(%topic, model = %llm.model(), summary_len = summary.len(), "reflect: called");
    let system_prompt = prompts.render("reflection", &PromptContext::new(topic))?;
    let response = llm
        .complete(CompletionRequest::json(
            system_prompt,
            build_reflection_message(summary),
            max_tokens,
        ))
        .await?;

    let reflection = parse_reflection(response.text(), topic);
    if reflection.fallback {
        warn!(%topic, raw = %response.text(), "reflect: no usable follow-up query, using fallback");
    } else {
        info!(
            follow_up_query = %reflection.follow_up_query,
            output_tokens = response.usage.output_tokens,
            "Reflected on summary"
        );
    }
    Ok(reflection)
}

fn parse_reflection(raw: &str, topic: &str) -> Reflection {
    let parsed: Option<ReflectionJson> = parse_json_object(raw);
    let (knowledge_gap, follow_up) = match parsed {
        Some(json) => (json.knowledge_gap, json.follow_up_query),
        None => {
            debug!("parse_reflection: answer is not a JSON object");
            (None, None)
        }
    };

    match follow_up.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()) {
        Some(follow_up_query) => Reflection {
            knowledge_gap,
            follow_up_query,
            fallback: false,
        },
        None => {
            debug!("parse_reflection: falling back");
            Reflection {
                knowledge_gap,
                follow_up_query: fallback_query(topic),
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
    async fn test_reflect_uses_follow_up_query() {
        let llm = MockLlmClient::with_texts([
            r#"{"knowledge_gap": "no benchmarks", "follow_up_query": "rust async runtime benchmarks"}"#,
        ]);
        let prompts = PromptLoader::embedded_only();

        let reflection = reflect(&llm, &prompts, "Rust", "Rust is fast.", 512).await.unwrap();

        assert_eq!(reflection.follow_up_query, "rust async runtime benchmarks");
        assert_eq!(reflection.knowledge_gap.as_deref(), Some("no benchmarks"));
        assert!(!reflection.fallback);

        let requests = llm.requests();
        let request = &requests[0];
        assert_eq!(request.format, ResponseFormat::Json);
        assert_eq!(
            request.last_user_text(),
            Some(
                "Identify a knowledge gap and generate a follow-up web search query based on our existing knowledge: Rust is fast."
            )
        );
        assert!(request.system_prompt.contains("analyzing a summary about Rust"));
    }

    #[tokio::test]
    async fn test_reflect_falls_back_without_follow_up_query() {
        let llm = MockLlmClient::with_texts([r#"{"knowledge_gap": "x"}"#]);
        let prompts = PromptLoader::embedded_only();

        let reflection = reflect(&llm, &prompts, "Test Topic", "S", 512).await.unwrap();
        assert_eq!(reflection.follow_up_query, "Tell me more about Test Topic");
        assert_eq!(reflection.knowledge_gap.as_deref(), Some("x"));
        assert!(reflection.fallback);
    }

    #[test]
    fn test_parse_reflection_malformed_or_blank() {
        assert!(parse_reflection("not json", "T").fallback);
        assert!(parse_reflection(r#"{"follow_up_query": ""}"#, "T").fallback);
        assert!(parse_reflection(r#"{"follow_up_query": null}"#, "T").fallback);
        assert_eq!(parse_reflection("[]", "T").follow_up_query, "Tell me more about T");
    }
}
