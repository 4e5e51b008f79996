//! Build command

use crate::app::{OutputFormat, SourceArgs};
use crate::output;
use crate::progress::ProgressReporter;
use anyhow::Result;
use secdocs_core::{Config, RagEngine};

pub async fn run(args: SourceArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let engine = RagEngine::from_config(config)?;

    let names: Vec<String> = match &args.source {
        Some(name) => vec![name.clone()],
        None => engine.catalog().names().into_iter().map(String::from).collect(),
    };

    let mut progress = ProgressReporter::new(names.len(), format == OutputFormat::Cli);
    let mut handles = Vec::with_capacity(names.len());

    for name in &names {
        progress.set_message(&format!("Indexing {}", name));
        handles.extend(engine.build(Some(name)).await?);
        progress.increment();
    }
    progress.finish();

    print!("{}", output::format_build(&handles, format)?);
    Ok(())
}
