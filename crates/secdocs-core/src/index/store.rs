//! Vector store abstraction

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chunk ready to be written to a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRecord {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Equality restriction on one metadata field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `metadata` satisfies the filter; only string values match
    pub fn matches(&self, metadata: &serde_json::Map<String, serde_json::Value>) -> bool {
        metadata
            .get(&self.field)
            .and_then(|v| v.as_str())
            .is_some_and(|v| v == self.value)
    }
}

/// A stored passage with its similarity to the query
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub record: PassageRecord,
    pub score: f64,
}

/// Backing store for per-source passage collections
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// True when the collection exists and holds at least one passage
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Insert or replace passages; returns the number written
    async fn upsert(&self, collection: &str, passages: &[PassageRecord]) -> Result<usize>;

    /// Up to `top_k` nearest passages to `text`, best first
    async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<StoreHit>>;

    /// Number of passages in the collection (0 when missing)
    async fn passage_count(&self, collection: &str) -> Result<usize>;
}
