//! Running summary creation and merging

use tracing::{debug, info, warn};

use super::ResearchError;
use super::markup::{drop_unclosed_thinking, strip_thinking_tokens};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::{PromptContext, PromptLoader};

/// Build the human turn for the summarizer
///
/// With an existing summary the model is asked to merge the new results
/// into it; otherwise to summarize the results from scratch.
pub fn build_summarizer_message(topic: &str, existing_summary: Option<&str>, new_results: &str) -> String {
    match existing_summary {
        Some(existing) => {
            debug!("build_summarizer_message: extending existing summary");
            format!(
                "<User Input> \n {} \n <User Input>\n\n\
                 <Existing Summary> \n {} \n <Existing Summary>\n\n\
                 <New Search Results> \n {} \n <New Search Results>",
                topic, existing, new_results
            )
        }
        None => {
            debug!("build_summarizer_message: creating new summary");
            format!(
                "<User Input> \n {} \n <User Input>\n\n\
                 <Search Results> \n {} \n <Search Results>",
                topic, new_results
            )
        }
    }
}

/// Create or extend the running summary from the latest search results
///
/// Reasoning segments are removed from the answer and the rest is trimmed.
/// If the answer was cut off at the token limit, an unclosed reasoning
/// segment is dropped too; when nothing is left the existing summary stands.
pub async fn summarize(
    llm: &dyn LlmClient,
    prompts: &PromptLoader,
    topic: &str,
    existing_summary: Option<&str>,
    new_results: &str,
    max_tokens: u32,
) -> Result<String, ResearchError> {
    debug!(
        model = %llm.model(),
        has_existing = existing_summary.is_some(),
        results_len = new_results.len(),
        "summarize: called"
    );
    let system_prompt = prompts.render("summarizer", &PromptContext::new(topic))?;
    let message = build_summarizer_message(topic, existing_summary, new_results);

    let response = llm
        .complete(CompletionRequest::text(system_prompt, message, max_tokens))
        .await?;

    let stripped = strip_thinking_tokens(response.text());
    let summary = if response.is_truncated() {
        warn!(
            output_tokens = response.usage.output_tokens,
            "summarize: answer hit the token limit"
        );
        drop_unclosed_thinking(&stripped).trim()
    } else {
        stripped.trim()
    };

    if summary.is_empty() && response.is_truncated() {
        if let Some(existing) = existing_summary {
            warn!("summarize: truncated answer held no summary, keeping existing one");
            return Ok(existing.to_string());
        }
    }

    info!(
        summary_len = summary.len(),
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "Updated running summary"
    );
    Ok(summary.to_string())
}
