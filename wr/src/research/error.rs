//! Research run errors

use std::time::Duration;
use thiserror::Error;

use crate::llm::LlmError;
use crate::search::SearchError;

/// Errors that abort a research run
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Research topic must not be empty")]
    EmptyTopic,

    #[error("Research run timed out after {0:?}")]
    Timeout(Duration),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ResearchError {
    /// Whether running the same topic again might succeed without changes
    pub fn is_retryable(&self) -> bool {
        match self {
            ResearchError::Llm(e) => e.is_retryable(),
            ResearchError::Search(e) => e.is_retryable(),
            ResearchError::Timeout(_) => true,
            ResearchError::EmptyTopic | ResearchError::Prompt(_) => false,
        }
    }
}

impl From<eyre::Report> for ResearchError {
    fn from(e: eyre::Report) -> Self {
        ResearchError::Prompt(e.to_string())
    }
}
