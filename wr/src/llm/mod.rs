//! LLM Client module for webresearcher
//!
//! Provides single-shot completion requests against Ollama or any
//! OpenAI-compatible server.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod ollama;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, ResponseFormat, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client for `model` based on the provider in config
///
/// The same connection settings serve both the text model and the JSON
/// model; only the model name differs.
pub fn create_client(config: &LlmConfig, model: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, %model, "create_client: called");
    match config.provider.as_str() {
        "ollama" => {
            debug!("create_client: creating Ollama client");
            Ok(Arc::new(OllamaClient::from_config(config, model)?))
        }
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config, model)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: ollama, openai",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_ollama() {
        let config = LlmConfig::default();
        let client = create_client(&config, "llama3.2").unwrap();
        assert_eq!(client.model(), "llama3.2");
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "smoke-signals".to_string(),
            ..Default::default()
        };
        let err = create_client(&config, "x").err().unwrap();
        assert!(err.to_string().contains("smoke-signals"));
    }
}
