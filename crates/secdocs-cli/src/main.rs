//! SecDocs CLI
//!
//! Source-routed question answering over cybersecurity reference documents.

use anyhow::Result;
use clap::Parser;
use secdocs_core::error::exit_codes;
use secdocs_core::{Config, SecDocsError};

mod app;
mod commands;
mod output;
mod progress;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<SecDocsError>()
            .map(SecDocsError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format).await,
        Commands::Plan(args) => commands::ask::run_plan(args, &config, cli.format).await,
        Commands::Sources => commands::sources::run(&config, cli.format),
        Commands::Build(args) => commands::build::run(args, &config, cli.format).await,
        Commands::Status => commands::status::run(&config, cli.format),
        Commands::Reset(args) => commands::status::run_reset(args, &config),
        Commands::Eval(args) => commands::eval::run(args, &config, cli.format).await,
    }
}
