//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Context for rendering prompt templates
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    /// The user-supplied research topic
    pub research_topic: String,
}

impl PromptContext {
    pub fn new(research_topic: impl Into<String>) -> Self {
        Self {
            research_topic: research_topic.into(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.webresearcher/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a prompt loader rooted at `workdir`
    ///
    /// Templates in `<workdir>/.webresearcher/prompts/` override the embedded
    /// ones by file name.
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        let workdir = workdir.as_ref();
        debug!(?workdir, "PromptLoader::new: called");
        let user_dir = workdir.join(".webresearcher/prompts");

        let user_dir_exists = user_dir.exists();
        if user_dir_exists {
            debug!(?user_dir, "PromptLoader::new: user override directory found");
        } else {
            debug!("PromptLoader::new: no user override directory");
        }

        Self {
            hbs: Self::engine(),
            user_dir: user_dir_exists.then_some(user_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text; search results must reach the model unescaped
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Names of all known templates
    pub fn names(&self) -> &'static [&'static str] {
        embedded::NAMES
    }

    /// Load a template's raw text, preferring the user override
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");

        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
