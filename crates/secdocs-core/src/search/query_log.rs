//! Per-query trace file
//!
//! One JSON object per line, one file per `answer` call. Write failures are
//! logged and disable the trace; they never fail the query.

use super::{Passage, RetrievalStep};
use crate::llm::RoutingDecision;
use chrono::Utc;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct QueryLog {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl QueryLog {
    /// Trace that records nothing
    pub fn disabled() -> Self {
        Self {
            path: None,
            writer: None,
        }
    }

    /// New `query_log_<timestamp>.jsonl` in `dir`, or a disabled trace on failure
    pub fn create(dir: &Path) -> Self {
        let file_name = format!("query_log_{}.jsonl", Utc::now().format("%Y%m%d_%H%M%S_%6f"));
        let path = dir.join(file_name);

        let opened = std::fs::create_dir_all(dir).and_then(|_| File::create(&path));
        match opened {
            Ok(file) => Self {
                path: Some(path),
                writer: Some(BufWriter::new(file)),
            },
            Err(e) => {
                tracing::warn!("Cannot create query log in {}: {}", dir.display(), e);
                Self::disabled()
            }
        }
    }

    /// Enabled only when a directory is given
    pub fn for_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::create).unwrap_or_else(Self::disabled)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    fn event(&mut self, event: &str, data: Value) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        let mut line = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
        });
        if let (Some(line), Value::Object(data)) = (line.as_object_mut(), data) {
            line.extend(data);
        }

        let written = serde_json::to_writer(&mut *writer, &line)
            .map_err(std::io::Error::from)
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());

        if let Err(e) = written {
            tracing::warn!("Query log write failed, disabling: {}", e);
            self.writer = None;
        }
    }

    pub fn start(&mut self, query: &str) {
        self.event("query_start", json!({ "query": query }));
    }

    pub fn routing(&mut self, decision: &RoutingDecision) {
        self.event(
            "source_selection",
            json!({
                "raw_response": decision.raw_response,
                "parsed": decision.parsed,
                "sources": decision.sources,
            }),
        );
    }

    pub fn expansion(&mut self, query: &str, terms: &[String]) {
        self.event(
            "query_expansion",
            json!({ "original_query": query, "expanded_terms": terms }),
        );
    }

    pub fn plan(&mut self, steps: &[RetrievalStep]) {
        self.event("master_plan", json!({ "plan": steps }));
    }

    pub fn retrieved(&mut self, passages: &[Passage]) {
        self.event("retrieved", json!({ "passages": passage_summaries(passages) }));
    }

    pub fn reranked(&mut self, passages: &[Passage]) {
        self.event("reranked", json!({ "passages": passage_summaries(passages) }));
    }

    pub fn final_prompt(&mut self, prompt: &str) {
        self.event("final_prompt", json!({ "prompt": prompt }));
    }

    pub fn final_response(&mut self, answer: &str, elapsed: Duration) {
        self.event(
            "final_response",
            json!({ "response": answer, "duration_secs": elapsed.as_secs_f64() }),
        );
    }

    pub fn error(&mut self, message: &str) {
        self.event("error", json!({ "message": message }));
    }
}

fn passage_summaries(passages: &[Passage]) -> Vec<Value> {
    passages
        .iter()
        .map(|p| {
            json!({
                "source": p.source,
                "id": p.id,
                "score": p.score,
                "content": p.content,
            })
        })
        .collect()
}
