//! LLM request/response types
//!
//! Provider-agnostic shapes for a single chat completion. Research steps build
//! one `CompletionRequest` per call: a system prompt plus one human message.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (rendered from a Handlebars template)
    pub system_prompt: String,

    /// Conversation messages (one human message for every research step)
    pub messages: Vec<Message>,

    /// Max tokens for the response
    pub max_tokens: u32,

    /// Whether the provider should constrain output to a JSON object
    pub format: ResponseFormat,
}

impl CompletionRequest {
    /// Build a free-text request with a single user message
    pub fn text(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        debug!(%max_tokens, "CompletionRequest::text: called");
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(user)],
            max_tokens,
            format: ResponseFormat::Text,
        }
    }

    /// Build a JSON-mode request with a single user message
    pub fn json(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        debug!(%max_tokens, "CompletionRequest::json: called");
        Self {
            format: ResponseFormat::Json,
            ..Self::text(system_prompt, user, max_tokens)
        }
    }

    /// Text of the last user message, if any
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Output constraint requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Structured output; providers are asked for a JSON object but may still
    /// return something that does not parse
    Json,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// Message role; the system prompt travels separately and every step is a
/// single user turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage reported by the provider
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Convenience constructor for a plain text answer
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    /// Content or an empty string
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// True when the provider cut the answer off at the token limit
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Other(String),
}

impl StopReason {
    /// Parse an OpenAI `finish_reason` or Ollama `done_reason`
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        debug!(?reason, "StopReason::from_finish_reason: called");
        match reason {
            None | Some("stop") => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            Some(other) => {
                debug!(%other, "StopReason::from_finish_reason: unrecognized reason");
                StopReason::Other(other.to_string())
            }
        }
    }
}

/// Token usage as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
