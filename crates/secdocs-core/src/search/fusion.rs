//! Deduplication and source-fair reranking

use super::Passage;
use crate::llm::{RerankDocument, Reranker};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Collapse repeated passages, keeping the first occurrence and its score
pub fn dedupe_passages(passages: impl IntoIterator<Item = Passage>) -> Vec<Passage> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    passages
        .into_iter()
        .filter(|p| seen.insert((p.source.clone(), p.id.clone())))
        .collect()
}

/// Reranks each source's passages independently, then concatenates them.
///
/// Every source with retrieved passages keeps up to `top_n` of them.
pub struct SourceFairReranker {
    reranker: Arc<dyn Reranker>,
    top_n: usize,
}

impl SourceFairReranker {
    pub fn new(reranker: Arc<dyn Reranker>) -> Self {
        let top_n = reranker.max_output();
        Self { reranker, top_n }
    }

    /// Keep at most `top_n` per source (never more than the reranker returns)
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    /// Partitions in `source_order`; sources not listed follow in first-seen order
    pub async fn rerank(
        &self,
        query: &str,
        passages: Vec<Passage>,
        source_order: &[String],
    ) -> Vec<Passage> {
        let partitions = partition_by_source(passages, source_order);

        let reranked = join_all(
            partitions
                .into_iter()
                .map(|(source, group)| self.rerank_partition(query, source, group)),
        )
        .await;

        reranked.into_iter().flatten().collect()
    }

    async fn rerank_partition(&self, query: &str, source: String, group: Vec<Passage>) -> Vec<Passage> {
        let limit = self.top_n.min(self.reranker.max_output()).max(1);

        let documents: Vec<RerankDocument> = group
            .iter()
            .map(|p| RerankDocument {
                id: p.id.clone(),
                text: p.content.clone(),
            })
            .collect();

        let results = match self.reranker.rerank(query, &documents).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Reranking '{}' failed: {}, keeping retrieval order", source, e);
                return group.into_iter().take(limit).collect();
            }
        };

        let mut by_id: HashMap<String, Passage> =
            group.iter().map(|p| (p.id.clone(), p.clone())).collect();

        let ranked: Vec<Passage> = results
            .into_iter()
            .filter_map(|r| {
                by_id.remove(&r.id).map(|mut p| {
                    p.score = r.score;
                    p
                })
            })
            .take(limit)
            .collect();

        if ranked.is_empty() {
            tracing::warn!("Reranker returned nothing usable for '{}', keeping retrieval order", source);
            return group.into_iter().take(limit).collect();
        }

        tracing::debug!("Reranked '{}': {} -> {} passages", source, group.len(), ranked.len());
        ranked
    }
}

fn partition_by_source(passages: Vec<Passage>, source_order: &[String]) -> Vec<(String, Vec<Passage>)> {
    let mut order: Vec<String> = source_order.to_vec();
    let mut groups: HashMap<String, Vec<Passage>> = HashMap::new();

    for passage in passages {
        if !order.contains(&passage.source) {
            order.push(passage.source.clone());
        }
        groups.entry(passage.source.clone()).or_default().push(passage);
    }

    order
        .into_iter()
        .filter_map(|source| groups.remove(&source).map(|group| (source, group)))
        .collect()
}
