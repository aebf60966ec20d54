//! Helpdesk CLI
//!
//! Main entry point for the helpdesk command-line tool.
//! Answers Ubuntu support questions from a local Q/A corpus.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, BuildCommand, ChatCommand, CleanCommand, PrepareCommand, StatsCommand};
use helpdesk_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Helpdesk - answers support questions from past support conversations
#[derive(Parser, Debug)]
#[command(name = "helpdesk")]
#[command(about = "Retrieval-based Ubuntu support assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "HELPDESK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "HELPDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge base name
    #[arg(short, long, global = true, env = "HELPDESK_BASE")]
    base: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Embedding provider (trigram, ollama)
    #[arg(short, long, global = true, env = "HELPDESK_PROVIDER")]
    provider: Option<String>,

    /// Embedding model identifier
    #[arg(short, long, global = true, env = "HELPDESK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question
    Ask(AskCommand),

    /// Interactive support session
    Chat(ChatCommand),

    /// Turn a dialogue export into a Q/A pair file
    Prepare(PrepareCommand),

    /// Filter, embed and publish a Q/A pair file
    Build(BuildCommand),

    /// Show statistics of the published build
    Stats(StatsCommand),

    /// Remove every build of the knowledge base
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.base,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("Helpdesk CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Knowledge base: {}", config.base);

    config.ensure_helpdesk_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Prepare(_) => "prepare",
        Commands::Build(_) => "build",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await?,
        Commands::Chat(cmd) => cmd.execute(&config).await?,
        Commands::Prepare(cmd) => cmd.execute(&config).await?,
        Commands::Build(cmd) => cmd.execute(&config).await?,
        Commands::Stats(cmd) => cmd.execute(&config).await?,
        Commands::Clean(cmd) => cmd.execute(&config).await?,
    }

    tracing::info!("Command completed successfully");
    Ok(())
}
