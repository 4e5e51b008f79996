//! Status and reset commands

use crate::app::{OutputFormat, ResetArgs};
use crate::output;
use anyhow::Result;
use secdocs_core::{Config, Database, HttpEmbedder, SecDocsError};
use std::sync::Arc;

fn open_database(config: &Config) -> Result<Database> {
    let embedder = Arc::new(HttpEmbedder::from_config(config.classifier.clone())?);
    let db = Database::open(config.database_path(), embedder)?;
    db.initialize()?;
    Ok(db)
}

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let db = open_database(config)?;
    let collections = db.list_collections()?;
    print!("{}", output::format_collections(&collections, format)?);
    Ok(())
}

pub fn run_reset(args: ResetArgs, config: &Config) -> Result<()> {
    let catalog = config.catalog()?;
    let kb = catalog
        .resolve(&args.source)
        .ok_or_else(|| SecDocsError::SourceNotFound(args.source.clone()))?;

    let db = open_database(config)?;
    if db.remove_collection(&kb.collection)? {
        println!("Removed collection '{}' ({})", kb.collection, kb.name);
    } else {
        println!("Collection '{}' was not indexed", kb.collection);
    }
    Ok(())
}
