//! Retrieval orchestration
//!
//! Provides:
//! - Identifier detection in free-text queries
//! - Per-source retrieval planning (exact lookup vs. semantic search)
//! - Concurrent plan execution with deduplication
//! - Source-fair reranking and the end-to-end `answer` pipeline

mod engine;
mod entity;
mod executor;
mod fusion;
mod planner;
mod query_log;

pub use engine::{AnswerOutcome, QueryPlan, QueryResult, RagEngine, NO_SOURCE_MESSAGE};
pub use entity::EntityIdDetector;
pub use executor::RetrievalExecutor;
pub use fusion::{dedupe_passages, SourceFairReranker};
pub use planner::{RetrievalPlanner, SemanticPassPolicy, DEFAULT_SEMANTIC_PASS_MIN_TOKENS};
pub use query_log::QueryLog;

use serde::{Deserialize, Serialize};

/// Metadata key carrying the originating document name
pub const SOURCE_DOCUMENT_FIELD: &str = "source_document";

/// A retrievable unit of text with its relevance score and origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Stable within its source
    pub id: String,
    pub content: String,
    pub score: f64,
    /// Knowledge base name
    pub source: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Passage {
    /// Identity used for deduplication
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.id)
    }

    pub fn source_document(&self) -> Option<&str> {
        self.metadata
            .get(SOURCE_DOCUMENT_FIELD)
            .and_then(|v| v.as_str())
    }
}

/// One unit of a retrieval plan, scoped to a single knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RetrievalStep {
    /// Exact-match lookup on a metadata field
    MetadataFilter {
        source: String,
        field: String,
        value: String,
    },

    /// Nearest-neighbour search, once per term
    SemanticSearch { source: String, terms: Vec<String> },
}

impl RetrievalStep {
    pub fn metadata_filter(
        source: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::MetadataFilter {
            source: source.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn semantic_search(source: impl Into<String>, query: impl Into<String>) -> Self {
        Self::SemanticSearch {
            source: source.into(),
            terms: vec![query.into()],
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::MetadataFilter { source, .. } | Self::SemanticSearch { source, .. } => source,
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::SemanticSearch { .. })
    }

    /// Replace the search terms of a semantic step; other steps are returned unchanged
    pub fn with_terms(self, new_terms: &[String]) -> Self {
        match self {
            Self::SemanticSearch { source, .. } => Self::SemanticSearch {
                source,
                terms: new_terms.to_vec(),
            },
            other => other,
        }
    }
}
