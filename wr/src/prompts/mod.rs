//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for the research steps.
//!
//! Template loading chain:
//! 1. `.webresearcher/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader};
