//! Plan execution against index handles

use super::fusion::dedupe_passages;
use super::{Passage, RetrievalStep};
use crate::index::{IndexCache, MetadataFilter};
use crate::error::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

const DEFAULT_METADATA_TOP_K: usize = 20;
const DEFAULT_SEMANTIC_TOP_K: usize = 10;
const DEFAULT_MAX_CONCURRENT_STEPS: usize = 4;

/// Runs retrieval steps against the cached per-source indices
pub struct RetrievalExecutor {
    cache: Arc<IndexCache>,
    metadata_top_k: usize,
    semantic_top_k: usize,
    max_concurrent_steps: usize,
}

impl RetrievalExecutor {
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self {
            cache,
            metadata_top_k: DEFAULT_METADATA_TOP_K,
            semantic_top_k: DEFAULT_SEMANTIC_TOP_K,
            max_concurrent_steps: DEFAULT_MAX_CONCURRENT_STEPS,
        }
    }

    pub fn with_limits(mut self, metadata_top_k: usize, semantic_top_k: usize) -> Self {
        self.metadata_top_k = metadata_top_k;
        self.semantic_top_k = semantic_top_k;
        self
    }

    pub fn with_concurrency(mut self, max_concurrent_steps: usize) -> Self {
        self.max_concurrent_steps = max_concurrent_steps.max(1);
        self
    }

    /// Passages for one step; empty when the source's index is unusable
    pub async fn execute(&self, step: &RetrievalStep) -> Result<Vec<Passage>> {
        let handle = self.cache.get(step.source()).await?;

        match step {
            RetrievalStep::MetadataFilter { field, value, .. } => {
                if field.is_empty() {
                    return Ok(vec![]);
                }
                let filter = MetadataFilter::eq(field.clone(), value.clone());
                handle.query(value, self.metadata_top_k, Some(&filter)).await
            }

            RetrievalStep::SemanticSearch { terms, .. } => {
                let mut passages = Vec::new();
                for term in terms {
                    passages.extend(handle.query(term, self.semantic_top_k, None).await?);
                }
                Ok(dedupe_passages(passages))
            }
        }
    }

    /// Run all steps concurrently and merge their results.
    ///
    /// Results are merged in plan order regardless of completion order, so
    /// the surviving duplicate is always the one from the earliest step. A
    /// failing step contributes nothing and does not abort the others.
    pub async fn execute_plan(&self, steps: &[RetrievalStep]) -> Vec<Passage> {
        let mut results: Vec<(usize, Vec<Passage>)> = stream::iter(steps.iter().enumerate())
            .map(|(idx, step)| async move {
                let passages = match self.execute(step).await {
                    Ok(passages) => passages,
                    Err(e) => {
                        tracing::warn!("Retrieval step {} on '{}' failed: {}", idx + 1, step.source(), e);
                        vec![]
                    }
                };
                tracing::debug!("Step {}/{}: {} passages", idx + 1, steps.len(), passages.len());
                (idx, passages)
            })
            .buffer_unordered(self.max_concurrent_steps)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);

        dedupe_passages(results.into_iter().flat_map(|(_, passages)| passages))
    }
}
