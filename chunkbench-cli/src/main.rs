//! chunkbench CLI - compare document chunking strategies for RAG.
//!
//! Runs the full benchmark over a corpus directory, chunks single files for
//! inspection, and manages configuration.

mod commands;
mod report;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// chunkbench: benchmark chunking strategies for retrieval-augmented generation
#[derive(Parser, Debug)]
#[command(name = "chunkbench", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds .chunkbench/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Evaluate every configured strategy over a corpus directory
    Run {
        /// Directory with catalog.json and one raw file per document
        #[arg(long)]
        corpus: PathBuf,

        /// Where the JSON and markdown reports are written
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Override experiment.num_queries
        #[arg(long)]
        num_queries: Option<usize>,

        /// Override experiment.top_k
        #[arg(long)]
        top_k: Option<usize>,

        /// Only run strategies with these names (repeatable)
        #[arg(long = "only")]
        only: Vec<String>,

        /// Skip generation and run retrieval-only
        #[arg(long)]
        no_generation: bool,

        /// Add embedding-based semantic overlap metrics
        #[arg(long)]
        semantic: bool,
    },
    /// Chunk one file and print the chunks
    Chunk {
        /// Text file to chunk
        file: PathBuf,

        /// fixed, recursive, paragraph, token or sentence
        #[arg(short, long, default_value = "recursive")]
        strategy: String,

        #[arg(long, default_value_t = 500)]
        size: usize,

        #[arg(long, default_value_t = 50)]
        overlap: usize,

        /// Print numbered chunks instead of a JSON array
        #[arg(long)]
        plain: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "chunkbench", "chunkbench")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chunkbench.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    chunkbench_core::sentence::initialize();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace).await
}
