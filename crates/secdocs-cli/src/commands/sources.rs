//! Sources command

use crate::app::OutputFormat;
use crate::output;
use anyhow::Result;
use secdocs_core::Config;

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let catalog = config.catalog()?;
    print!("{}", output::format_sources(&catalog, format)?);
    Ok(())
}
