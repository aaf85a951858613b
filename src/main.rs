mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use revdict::config::RevdictConfig;
use revdict::dictionary::types::Model;

#[derive(Parser)]
#[command(name = "revdict", version, about = "Reverse dictionary over sentence embeddings")]
struct Cli {
    /// Config file (defaults to ~/.revdict/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve,
    /// Find words matching a description
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print the embedding of a phrase as JSON
    Embed {
        phrase: String,
        /// Only print this model's vector
        #[arg(short, long)]
        model: Option<Model>,
    },
    /// Print the cosine distance between two phrases under each model
    Compare {
        a: String,
        b: String,
        /// Only report this model
        #[arg(short, long)]
        model: Option<Model>,
    },
    /// Show a random entry
    Random {
        /// Also paraphrase its definition through the completion model
        #[arg(long)]
        rephrase: bool,
    },
    /// Ingest entries from a JSON array (or export JSON lines) of {text, definition, example, author}
    Import {
        file: PathBuf,
        /// Add paraphrased sentences as extra features
        #[arg(long)]
        rephrase: bool,
    },
    /// Write every entry to stdout as JSON lines
    Export,
    /// Show an entry with its features and stored vectors
    Inspect { id: i64 },
    /// Show dictionary statistics
    Stats,
    /// Run database diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RevdictConfig::load_from(path)?,
        None => RevdictConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => revdict::server::serve(config).await?,
        Command::Search { query, limit } => cli::search::search(&config, &query, limit).await?,
        Command::Embed { phrase, model } => cli::embed::embed(&config, &phrase, model).await?,
        Command::Compare { a, b, model } => cli::embed::compare(&config, &a, &b, model).await?,
        Command::Random { rephrase } => cli::random::random(&config, rephrase).await?,
        Command::Import { file, rephrase } => cli::import::import(&config, &file, rephrase).await?,
        Command::Export => cli::export::export(&config)?,
        Command::Inspect { id } => cli::inspect::inspect(&config, id)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
