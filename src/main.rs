mod cli;
mod config;
mod embedding;
mod persist;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mnemo", version, about = "On-device conversational memory store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored sessions, most recently updated first
    Sessions,
    /// Show store statistics
    Stats,
    /// Search stored messages by meaning
    Search {
        /// Query text
        query: String,
        /// Restrict the search to one session
        #[arg(long)]
        session: Option<String>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Apply the retention policy (age, session cap, per-session message cap)
    Cleanup,
    /// Export the store as snapshot JSON to stdout
    Export,
    /// Import a snapshot JSON file, replacing the store contents
    Import {
        /// Path to a snapshot JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::MnemoConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for exported JSON.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Sessions => cli::sessions::sessions(&config).await?,
        Command::Stats => cli::stats::stats(&config).await?,
        Command::Search {
            query,
            session,
            limit,
        } => cli::search::search(&config, &query, session.as_deref(), limit).await?,
        Command::Cleanup => cli::cleanup::cleanup(&config).await?,
        Command::Export => cli::export::export(&config).await?,
        Command::Import { file } => cli::import::import(&config, &file).await?,
    }

    Ok(())
}
