//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// webresearcher - iterative web research summaries
#[derive(Parser)]
#[command(
    name = "wr",
    about = "Research a topic by searching, summarizing and reflecting in a loop",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help(),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research a topic and print the summary with sources
    Run {
        /// Topic to research
        topic: String,

        /// Follow-up searches after the first one
        #[arg(short, long)]
        max_loops: Option<u32>,

        /// Model for summaries
        #[arg(long)]
        model: Option<String>,

        /// Model for query writing and reflection
        #[arg(long)]
        json_model: Option<String>,

        /// Also write the result to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only print the result
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the effective configuration as YAML
    Config,

    /// List prompt templates, or print one
    Prompts {
        /// Template name
        name: Option<String>,
    },
}

/// Directory the log file is written to
pub fn get_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webresearcher")
        .join("logs")
}

/// Path of the log file
pub fn get_log_path() -> PathBuf {
    get_log_dir().join("webresearcher.log")
}

fn after_help() -> String {
    format!(
        "Environment:\n  TAVILY_API_KEY    search API key (default api-key-env)\n  OPENAI_API_KEY    LLM API key for the openai provider\n  OLLAMA_HOST       Ollama base URL when base-url is unset\n\nLogs are written to: {}",
        get_log_path().display()
    )
}
