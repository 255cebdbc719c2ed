//! webresearcher configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Providers the LLM factory knows how to build
pub const LLM_PROVIDERS: &[&str] = &["ollama", "openai"];

/// Providers the search factory knows how to build
pub const SEARCH_PROVIDERS: &[&str] = &["tavily"];

/// Main webresearcher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); the CLI flag wins
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Language model configuration
    pub llm: LlmConfig,

    /// Web search configuration
    pub search: SearchConfig,

    /// Research loop configuration
    pub research: ResearchConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks provider names and that required API keys are present, so a run
    /// fails before its first external call rather than halfway through.
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        if !LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(eyre::eyre!(
                "Unknown LLM provider '{}'. Supported: {}",
                self.llm.provider,
                LLM_PROVIDERS.join(", ")
            ));
        }
        if !SEARCH_PROVIDERS.contains(&self.search.provider.as_str()) {
            return Err(eyre::eyre!(
                "Unknown search provider '{}'. Supported: {}",
                self.search.provider,
                SEARCH_PROVIDERS.join(", ")
            ));
        }
        self.llm.get_api_key()?;
        self.search.get_api_key()?;
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// 1. Explicit `--config` path
    /// 2. `./.webresearcher.yml`
    /// 3. `<config_dir>/webresearcher/webresearcher.yml`
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".webresearcher.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("webresearcher").join("webresearcher.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed: a broken config file is reported properly by
    /// `load` once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("ollama" or "openai")
    pub provider: String,

    /// Model used for free-text calls (summarization)
    pub model: String,

    /// Model used for JSON-mode calls (query writing, reflection); falls back to `model`
    #[serde(rename = "json-model", skip_serializing_if = "Option::is_none")]
    pub json_model: Option<String>,

    /// API base URL; provider default when unset
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable holding the API key (required for openai)
    #[serde(rename = "api-key-env", skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f64,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "deepseek-r1".to_string(),
            json_model: Some("llama3.2".to_string()),
            base_url: None,
            api_key_env: None,
            max_tokens: 8192,
            temperature: 0.0,
            timeout_ms: 300_000,
        }
    }
}

impl LlmConfig {
    /// Base URL to use, taking the provider default when unset
    pub fn effective_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "openai" => "https://api.openai.com".to_string(),
            _ => std::env::var("OLLAMA_HOST")
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        }
    }

    /// Model for JSON-mode calls
    pub fn effective_json_model(&self) -> &str {
        self.json_model.as_deref().unwrap_or(&self.model)
    }

    /// Resolve the API key from the environment
    ///
    /// Ollama needs no key unless `api-key-env` is set explicitly; openai
    /// defaults to `OPENAI_API_KEY`.
    pub fn get_api_key(&self) -> Result<Option<String>> {
        let env_name = match (&self.api_key_env, self.provider.as_str()) {
            (Some(name), _) => name.clone(),
            (None, "openai") => "OPENAI_API_KEY".to_string(),
            (None, _) => return Ok(None),
        };
        std::env::var(&env_name)
            .map(Some)
            .map_err(|_| eyre::eyre!("LLM API key not found. Set the {} environment variable.", env_name))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Provider name (currently only "tavily")
    pub provider: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "tavily".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            base_url: "https://api.tavily.com".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl SearchConfig {
    /// Resolve the API key from the environment
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            eyre::eyre!(
                "Search API key not found. Set the {} environment variable.",
                self.api_key_env
            )
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Research loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Follow-up searches allowed after the first; the loop runs one more
    /// search than this number
    #[serde(rename = "max-web-search-loops")]
    pub max_web_search_loops: u32,

    /// Results requested per search
    #[serde(rename = "max-results")]
    pub max_results: u32,

    /// Ask the search service for full page content
    #[serde(rename = "fetch-full-page")]
    pub fetch_full_page: bool,

    /// Per-source budget for full page content, in tokens (4 chars each)
    #[serde(rename = "max-tokens-per-source")]
    pub max_tokens_per_source: usize,

    /// Wall-clock budget for a whole run in milliseconds
    #[serde(rename = "run-timeout-ms", skip_serializing_if = "Option::is_none")]
    pub run_timeout_ms: Option<u64>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_web_search_loops: 3,
            max_results: 1,
            fetch_full_page: true,
            max_tokens_per_source: 1000,
            run_timeout_ms: None,
        }
    }
}

impl ResearchConfig {
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }
}
