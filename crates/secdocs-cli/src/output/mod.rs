//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use crate::commands::eval::EvalRow;
use anyhow::Result;
use secdocs_core::{CollectionInfo, IndexHandle, KnowledgeBaseCatalog, QueryPlan, QueryResult};
use std::sync::Arc;

pub fn format_answer(result: &QueryResult, format: OutputFormat, show_context: bool) -> Result<String> {
    match format {
        OutputFormat::Json => json::format_answer(result, show_context),
        OutputFormat::Cli => Ok(terminal::format_answer(result, show_context)),
    }
}

pub fn format_plan(plan: &QueryPlan, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::to_pretty(plan),
        OutputFormat::Cli => Ok(terminal::format_plan(plan)),
    }
}

pub fn format_sources(catalog: &KnowledgeBaseCatalog, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format_sources(catalog),
        OutputFormat::Cli => Ok(terminal::format_sources(catalog)),
    }
}

pub fn format_build(handles: &[Arc<IndexHandle>], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format_build(handles),
        OutputFormat::Cli => Ok(terminal::format_build(handles)),
    }
}

pub fn format_collections(collections: &[CollectionInfo], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::to_pretty(collections),
        OutputFormat::Cli => Ok(terminal::format_collections(collections)),
    }
}

pub fn format_eval(rows: &[EvalRow], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::to_pretty(rows),
        OutputFormat::Cli => Ok(terminal::format_eval(rows)),
    }
}
