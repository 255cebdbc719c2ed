//! webresearcher - iterative web research summaries
//!
//! CLI entry point.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use webresearcher::cli::{Cli, Command, get_log_dir, get_log_path};
use webresearcher::config::Config;
use webresearcher::llm::create_client;
use webresearcher::prompts::PromptLoader;
use webresearcher::research::{ResearchEngine, ResearchError, ResearchEvent};
use webresearcher::search::create_search_client;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = get_log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(get_log_path()).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may live in .env; load it before anything reads the environment
    let dotenv = dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;
    if let Some(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            topic,
            max_loops,
            model,
            json_model,
            output,
            quiet,
        } => {
            debug!(%topic, ?max_loops, ?model, ?json_model, "main: matched Run command");
            let mut config = config;
            if let Some(max) = max_loops {
                config.research.max_web_search_loops = max;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }
            if let Some(json_model) = json_model {
                config.llm.json_model = Some(json_model);
            }
            cmd_run(&config, &topic, output, quiet).await
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
        Command::Prompts { name } => {
            debug!(?name, "main: matched Prompts command");
            cmd_prompts(name.as_deref())
        }
    }
}

async fn cmd_run(config: &Config, topic: &str, output: Option<PathBuf>, quiet: bool) -> Result<()> {
    debug!(%topic, ?output, quiet, "cmd_run: called");
    // Reject a blank topic before touching keys or the network
    if topic.trim().is_empty() {
        return Err(ResearchError::EmptyTopic.into());
    }
    config.validate().context("Invalid configuration")?;

    let llm = create_client(&config.llm, &config.llm.model).context("Failed to create LLM client")?;
    let llm_json =
        create_client(&config.llm, config.llm.effective_json_model()).context("Failed to create JSON LLM client")?;
    let search = create_search_client(&config.search).context("Failed to create search client")?;
    debug!("cmd_run: clients created");

    let workdir = std::env::current_dir()?;
    let engine = ResearchEngine::new(config.research.clone(), llm, llm_json, search)
        .with_prompts_from(&workdir)
        .with_max_tokens(config.llm.max_tokens);

    if !quiet {
        eprintln!("{} {}", "Researching:".bold(), topic.cyan());
        eprintln!(
            "  Models: {} (text), {} (json)",
            config.llm.model,
            config.llm.effective_json_model()
        );
        eprintln!(
            "  Searches: {}",
            config.research.max_web_search_loops.saturating_add(1)
        );
        eprintln!();
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = if quiet {
        drop(tx);
        engine
    } else {
        engine.with_events(tx)
    };
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let result = engine.run(topic).await;
    drop(engine);
    // Drain progress output before the result
    join_printer(printer).await;

    let document = match result {
        Ok(document) => document,
        Err(e) => {
            if e.is_retryable() {
                eprintln!("{} this failure looks transient; running again may succeed", "note:".yellow());
            }
            return Err(eyre::Report::new(e).wrap_err("Research failed"));
        }
    };
    info!(len = document.len(), "cmd_run: research complete");

    println!("{}", document);

    if let Some(path) = output {
        fs::write(&path, &document).context(format!("Failed to write {}", path.display()))?;
        if !quiet {
            eprintln!("\n{} Wrote {}", "✓".green(), path.display());
        }
    }
    Ok(())
}

/// Wait for the progress printer; a failure there is logged, never fatal.
/// Returns whether it finished cleanly.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "join_printer: progress printer failed");
            false
        }
    }
}

fn print_event(event: &ResearchEvent) {
    match event {
        ResearchEvent::QueryGenerated { query, fallback } => {
            let note = if *fallback { " (fallback)".yellow().to_string() } else { String::new() };
            eprintln!("{} {}{}", "query:".dimmed(), query, note);
        }
        ResearchEvent::SearchCompleted {
            loop_count,
            result_count,
            ..
        } => {
            eprintln!("{} search {} returned {} result(s)", "→".cyan(), loop_count, result_count);
        }
        ResearchEvent::SummaryUpdated { summary_len, .. } => {
            eprintln!("{} summary updated ({} chars)", "→".cyan(), summary_len);
        }
        ResearchEvent::Reflected {
            loop_count,
            follow_up_query,
            fallback,
            ..
        } => {
            let note = if *fallback { " (fallback)".yellow().to_string() } else { String::new() };
            eprintln!("loop number {}: query: {}{}", loop_count, follow_up_query, note);
        }
        ResearchEvent::Finalized {
            loop_count,
            source_count,
        } => {
            eprintln!(
                "{} finished after {} searches, {} source block(s)\n",
                "✓".green(),
                loop_count,
                source_count
            );
        }
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

fn cmd_prompts(name: Option<&str>) -> Result<()> {
    debug!(?name, "cmd_prompts: called");
    let loader = PromptLoader::new(std::env::current_dir()?);
    match name {
        Some(name) => {
            let template = loader.load_template(name)?;
            print!("{}", template);
        }
        None => {
            for name in loader.names() {
                println!("{}", name);
            }
        }
    }
    Ok(())
}
