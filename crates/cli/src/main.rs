//! ragline CLI
//!
//! Main entry point for the ragline command-line tool. Builds every
//! capability once from configuration and hands references to the
//! command handlers.

mod commands;
mod services;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, HealthCommand, IngestCommand, StatsCommand};
use ragline_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// ragline - grounded answers with citations from your document index
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented answers with source citations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGLINE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// LLM provider (huggingface, ollama)
    #[arg(short, long, global = true, env = "RAGLINE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "RAGLINE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one question against the index
    Ask(AskCommand),

    /// Interactive multi-turn conversation
    Chat(ChatCommand),

    /// Chunk, embed and index documents
    Ingest(IngestCommand),

    /// Show vector index statistics
    Stats(StatsCommand),

    /// Check index, embedder and language model
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Chat(_) => "chat",
            Commands::Ingest(_) => "ingest",
            Commands::Stats(_) => "stats",
            Commands::Health(_) => "health",
        }
    }
}

/// Environment and default config file first, then an explicitly chosen
/// workspace or file, then flags.
fn load_config(cli: &Cli) -> AppResult<AppConfig> {
    let mut config = AppConfig::load()?;

    let explicit = match (&cli.config, &cli.workspace) {
        (Some(file), _) if config.config_file.as_ref() != Some(file) => Some(file.clone()),
        (None, Some(workspace)) if *workspace != config.workspace => {
            Some(workspace.join(".ragline").join("config.yaml"))
        }
        _ => None,
    };
    if let Some(path) = explicit.filter(|p| p.exists()) {
        config = config.merge_yaml(&path)?;
    }

    let config = config.with_overrides(
        cli.workspace.clone(),
        cli.config.clone(),
        cli.provider.clone(),
        cli.model.clone(),
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("ragline starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_ragline_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!(kind = e.kind(), "Command failed: {}", e),
    }

    result
}
