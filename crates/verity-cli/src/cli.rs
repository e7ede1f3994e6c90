//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Verity CLI - Ask verified questions against a private document corpus.
#[derive(Debug, Parser)]
#[command(name = "verity")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Human-readable format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (answer text only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a question and get a verified answer
    Ask(AskArgs),

    /// Ingest a corpus directory into the evidence store
    Ingest(IngestArgs),

    /// Search the evidence store directly
    Search(SearchArgs),

    /// Enter interactive REPL mode
    Repl,
}

/// Arguments for the ask command.
#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Restrict retrieval to one department
    #[arg(short, long)]
    pub department: Option<String>,

    /// Print pipeline state transitions while the run executes
    #[arg(short, long)]
    pub progress: bool,
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Corpus root directory (subdirectories are departments)
    pub path: PathBuf,
}

/// Arguments for the search command.
#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query text
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Restrict search to one department
    #[arg(short, long)]
    pub department: Option<String>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
