//! Terminal output formatter

use crate::commands::eval::EvalRow;
use secdocs_core::{
    AnswerOutcome, CollectionInfo, IndexHandle, IndexState, KnowledgeBaseCatalog, QueryPlan,
    QueryResult, RetrievalStep,
};
use std::sync::Arc;

pub fn format_answer(result: &QueryResult, show_context: bool) -> String {
    let mut output = String::new();

    if show_context && !result.context.is_empty() {
        output.push_str("--- Context ---\n");
        output.push_str(&result.context);
        output.push_str("\n--- End of Context ---\n\n");
    }

    output.push_str(&result.answer);
    output.push('\n');

    let sources = if result.selected_sources.is_empty() {
        "none".to_string()
    } else {
        result.selected_sources.join(", ")
    };
    output.push_str(&format!(
        "\n[{:.2}s | sources: {} | passages: {}]\n",
        result.elapsed.as_secs_f64(),
        sources,
        result.passages.len()
    ));

    output
}

fn format_step(step: &RetrievalStep) -> String {
    match step {
        RetrievalStep::MetadataFilter {
            source,
            field,
            value,
        } => format!("{:<24} filter {} = {}", source, field, value),
        RetrievalStep::SemanticSearch { source, terms } => {
            format!("{:<24} semantic {}", source, terms.join(" | "))
        }
    }
}

pub fn format_plan(plan: &QueryPlan) -> String {
    if plan.selected_sources.is_empty() {
        return "No knowledge base selected\n".to_string();
    }

    let mut output = format!("Sources: {}\n", plan.selected_sources.join(", "));
    if let Some(ref terms) = plan.expanded_terms {
        output.push_str(&format!("Expanded: {}\n", terms.join(", ")));
    }
    output.push('\n');

    for (i, step) in plan.steps.iter().enumerate() {
        output.push_str(&format!("{:>2}. {}\n", i + 1, format_step(step)));
    }

    output
}

pub fn format_sources(catalog: &KnowledgeBaseCatalog) -> String {
    let mut output = String::new();

    for kb in catalog.iter() {
        output.push_str(&format!("{} [{}]\n", kb.display_name(), kb.category.label()));
        output.push_str(&format!("  {}\n", kb.description));
        if !kb.identifier_prefixes.is_empty() {
            let prefixes: Vec<String> = kb
                .identifier_prefixes
                .iter()
                .map(|(prefix, field)| format!("{}-* -> {}", prefix, field))
                .collect();
            output.push_str(&format!("  ids: {}\n", prefixes.join(", ")));
        }
    }

    output
}

pub fn format_build(handles: &[Arc<IndexHandle>]) -> String {
    let mut output = String::new();

    for handle in handles {
        let state = match handle.state() {
            IndexState::Ready { passages } => format!("{} passages", passages),
            IndexState::Unusable { reason } => format!("unusable ({})", reason),
        };
        output.push_str(&format!(
            "{:<24} {:<28} {}\n",
            handle.source(),
            handle.collection(),
            state
        ));
    }

    output
}

pub fn format_collections(collections: &[CollectionInfo]) -> String {
    if collections.is_empty() {
        return "No collections indexed\n".to_string();
    }

    let mut output = String::new();
    for c in collections {
        output.push_str(&format!(
            "{:<28} {:>7} passages  {} ({}d)  updated {}\n",
            c.name, c.passage_count, c.embedding_model, c.dimensions, c.updated_at
        ));
    }
    output
}

pub fn format_eval(rows: &[EvalRow]) -> String {
    let mut output = String::new();

    for row in rows {
        let status = match (&row.error, row.outcome) {
            (Some(e), _) => format!("ERROR {}", e),
            (None, Some(AnswerOutcome::Answered)) => "answered".to_string(),
            (None, Some(AnswerOutcome::NoSourceSelected)) => "no source".to_string(),
            (None, Some(AnswerOutcome::NoPassagesRetrieved)) => "no passages".to_string(),
            (None, None) => "-".to_string(),
        };
        let routed = if row.routed { "routed" } else { "MISROUTED" };
        output.push_str(&format!(
            "{:<24} {:<9} {:>6.2}s  {}  {}\n",
            row.source, routed, row.elapsed_secs, status, row.question
        ));
    }

    let total = rows.len();
    let routed = rows.iter().filter(|r| r.routed).count();
    let answered = rows
        .iter()
        .filter(|r| r.outcome == Some(AnswerOutcome::Answered))
        .count();
    output.push_str(&format!(
        "\n{} questions: {} routed to their source, {} answered\n",
        total, routed, answered
    ));

    output
}
