//! docqa CLI
//!
//! Runs the document question answering server and exposes the same
//! operations for local use.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, PromptsCommand, QueryCommand, ServeCommand};
use docqa_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// docqa - question answering over uploaded PDFs and CSVs
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Question answering over uploaded PDFs and CSVs", long_about = None)]
#[command(version)]
struct Cli {
    /// Data directory for uploads, indices and prompt overrides
    #[arg(short, long, global = true, env = "DOCQA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to config file (default: <data-dir>/docqa.yaml)
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
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

    /// Generation model identifier
    #[arg(short, long, global = true, env = "DOCQA_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Upload a local PDF or CSV
    Ingest(IngestCommand),

    /// Ask a question about an uploaded document
    Query(QueryCommand),

    /// Ask the model directly, without a document
    Ask(AskCommand),

    /// List prompt templates
    Prompts(PromptsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Serve(_) => "serve",
            Commands::Ingest(_) => "ingest",
            Commands::Query(_) => "query",
            Commands::Ask(_) => "ask",
            Commands::Prompts(_) => "prompts",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // The config file is looked up under the data dir given on the command line.
    let config_file = cli.config.clone().or_else(|| {
        cli.data_dir
            .as_ref()
            .map(|dir| dir.join(docqa_core::config::CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    });

    let config = AppConfig::load_from(config_file.as_deref())?.with_overrides(
        cli.data_dir,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(
        config.logging.level.as_deref(),
        config.logging.format,
        !config.logging.color,
    )?;

    config.validate()?;

    tracing::info!("docqa starting");
    tracing::debug!("Data dir: {:?}", config.data_dir);
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Model: {}", config.llm.model);

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
