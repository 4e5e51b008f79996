//! Ask and plan commands

use crate::app::{AskArgs, OutputFormat, QueryArgs};
use crate::output;
use anyhow::Result;
use secdocs_core::{Config, RagEngine};

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let engine = RagEngine::from_config(config)?;
    let result = engine.answer(&args.query.text()).await?;
    print!("{}", output::format_answer(&result, format, args.show_context)?);
    Ok(())
}

pub async fn run_plan(args: QueryArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let engine = RagEngine::from_config(config)?;
    let plan = engine.plan(&args.text()).await?;
    print!("{}", output::format_plan(&plan, format)?);
    Ok(())
}
