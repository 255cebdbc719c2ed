//! webresearcher - iterative research summaries from web search
//!
//! Given a topic, webresearcher asks a language model for a search query,
//! searches the web, summarizes what it found, asks the model what the
//! summary is still missing, and searches again. After a fixed number of
//! loops the summary is returned with a list of its sources.
//!
//! # Modules
//!
//! - [`research`] - Research loop engine, state and steps
//! - [`llm`] - LLM client trait with Ollama and OpenAI implementations
//! - [`search`] - Search client trait, Tavily implementation and result formatting
//! - [`prompts`] - Prompt templates
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`transport`] - HTTP POST with retry shared by the LLM and search clients

pub mod cli;
pub mod config;
pub mod llm;
pub mod prompts;
pub mod research;
pub mod search;
pub mod transport;

pub use config::Config;
pub use research::{Phase, ResearchEngine, ResearchError, ResearchEvent, ResearchState};
