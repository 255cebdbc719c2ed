//! Ollama API client implementation
//!
//! Talks to the `/api/chat` endpoint with streaming disabled. JSON mode maps
//! to Ollama's `format: "json"` request field.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, ResponseFormat, StopReason, TokenUsage};
use crate::config::LlmConfig;
use crate::transport::post_json;

/// Ollama chat client for a single model
pub struct OllamaClient {
    model: String,
    base_url: String,
    api_key: Option<String>,
    http: Client,
    max_tokens: u32,
    temperature: f64,
}

impl OllamaClient {
    /// Create a client for `model` using the connection settings in `config`
    pub fn from_config(config: &LlmConfig, model: &str) -> Result<Self, LlmError> {
        debug!(%model, base_url = %config.effective_base_url(), "OllamaClient::from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Config(e.to_string()))?;
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: model.to_string(),
            base_url: config.effective_base_url(),
            api_key,
            http,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build the request body for the Ollama chat API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, format = ?request.format, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": request.max_tokens.min(self.max_tokens),
            },
        });

        if request.format == ResponseFormat::Json {
            debug!("build_request_body: json mode");
            body["format"] = serde_json::json!("json");
        }

        body
    }

    fn parse_response(&self, api_response: OllamaResponse) -> CompletionResponse {
        debug!(done_reason = ?api_response.done_reason, "parse_response: called");
        let content = api_response.message.map(|m| m.content).filter(|c| !c.is_empty());
        CompletionResponse {
            content,
            stop_reason: StopReason::from_finish_reason(api_response.done_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: api_response.prompt_eval_count.unwrap_or(0),
                output_tokens: api_response.eval_count.unwrap_or(0),
            },
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_request_body(&request);

        let response = post_json(&self.http, &url, self.api_key.as_deref(), &body).await?;
        let api_response: OllamaResponse = response.json().await?;
        Ok(self.parse_response(api_response))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Ollama API response types

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}
