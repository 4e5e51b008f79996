//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "secdocs")]
#[command(
    author,
    version,
    about = "Ask questions over cybersecurity regulations, frameworks and threat catalogs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file (defaults to SECDOCS_CONFIG or the user config dir)
    #[arg(long, global = true, env = "SECDOCS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a question from the knowledge bases
    Ask(AskArgs),

    /// Show which sources and retrieval steps a question would use
    Plan(QueryArgs),

    /// List the knowledge base catalog
    Sources,

    /// Build (or open) per-source indices ahead of time
    Build(SourceArgs),

    /// Show indexed collections
    Status,

    /// Drop a source's collection so the next query re-indexes it
    Reset(ResetArgs),

    /// Run each source's sample questions end to end
    Eval(SourceArgs),
}

#[derive(Args)]
pub struct QueryArgs {
    /// Question text
    #[arg(required = true)]
    pub query: Vec<String>,
}

impl QueryArgs {
    pub fn text(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Print the passages handed to the answer model
    #[arg(long)]
    pub show_context: bool,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Limit to one knowledge base
    #[arg(short, long)]
    pub source: Option<String>,
}

#[derive(Args)]
pub struct ResetArgs {
    /// Knowledge base name
    pub source: String,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
