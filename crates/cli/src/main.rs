//! reviewqa CLI
//!
//! Ask questions about products and get answers grounded in customer
//! reviews, with per-session conversation memory.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, IngestCommand, StatsCommand};
use reviewqa_core::config::{AppConfig, ConfigOverrides};
use reviewqa_core::logging::{self, LogOptions};
use reviewqa_core::AppResult;
use std::path::PathBuf;

/// reviewqa - conversational Q&A over product reviews
#[derive(Parser, Debug)]
#[command(name = "reviewqa")]
#[command(about = "Conversational Q&A over product reviews", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "REVIEWQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "REVIEWQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Chat provider (openrouter, openai, ollama)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Number of reviews retrieved per question
    #[arg(short = 'k', long, global = true)]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one question
    Ask(AskCommand),

    /// Interactive conversation
    Chat(ChatCommand),

    /// Load reviews into the vector index
    Ingest(IngestCommand),

    /// Show index, history and prompt statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(ConfigOverrides {
        provider: cli.provider,
        model: cli.model,
        top_k: cli.top_k,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
        json_logs: cli.json_logs,
    });

    logging::init_logging(LogOptions {
        level: config.log_level.as_deref(),
        no_color: config.no_color,
        json: config.json_logs,
    })?;

    tracing::info!("reviewqa starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Chat: {} / {}", config.chat.provider, config.chat.model);
    tracing::debug!(
        "Embedding: {} / {}",
        config.embedding.provider,
        config.embedding.model
    );

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Ingest(_) => "ingest",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!(kind = e.kind(), "Command failed: {}", e),
    }

    result
}
