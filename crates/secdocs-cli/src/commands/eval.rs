//! Eval command: run every source's sample questions end to end

use crate::app::{OutputFormat, SourceArgs};
use crate::output;
use crate::progress::ProgressReporter;
use anyhow::Result;
use secdocs_core::{AnswerOutcome, Config, RagEngine, SecDocsError};
use serde::Serialize;

/// Outcome of one sample question
#[derive(Debug, Serialize)]
pub struct EvalRow {
    pub source: String,
    pub question: String,
    /// Whether the router picked the source the question was written for
    pub routed: bool,
    pub outcome: Option<AnswerOutcome>,
    pub selected_sources: Vec<String>,
    pub elapsed_secs: f64,
    pub error: Option<String>,
}

pub async fn run(args: SourceArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let engine = RagEngine::from_config(config)?;
    let catalog = engine.catalog().clone();

    let sources: Vec<_> = match &args.source {
        Some(name) => vec![catalog
            .resolve(name)
            .ok_or_else(|| SecDocsError::SourceNotFound(name.clone()))?],
        None => catalog.iter().collect(),
    };

    let questions: Vec<(String, String)> = sources
        .iter()
        .flat_map(|kb| {
            kb.sample_questions
                .iter()
                .map(move |q| (kb.name.clone(), q.clone()))
        })
        .collect();

    let mut progress = ProgressReporter::new(questions.len(), format == OutputFormat::Cli);
    let mut rows = Vec::with_capacity(questions.len());

    for (source, question) in questions {
        progress.set_message(&format!("{}: {}", source, question));

        // one failing question does not stop the run
        let row = match engine.answer(&question).await {
            Ok(result) => EvalRow {
                routed: result.selected_sources.contains(&source),
                outcome: Some(result.outcome),
                selected_sources: result.selected_sources,
                elapsed_secs: result.elapsed.as_secs_f64(),
                error: None,
                source,
                question,
            },
            Err(e) => EvalRow {
                source,
                question,
                routed: false,
                outcome: None,
                selected_sources: vec![],
                elapsed_secs: 0.0,
                error: Some(e.to_string()),
            },
        };
        rows.push(row);
        progress.increment();
    }
    progress.finish();

    print!("{}", output::format_eval(&rows, format)?);
    Ok(())
}
