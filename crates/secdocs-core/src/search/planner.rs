//! Per-source retrieval planning

use super::entity::EntityIdDetector;
use super::RetrievalStep;
use crate::catalog::KnowledgeBaseCatalog;
use crate::error::{Result, SecDocsError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_SEMANTIC_PASS_MIN_TOKENS: usize = 5;

/// When a broad semantic search runs next to identifier lookups.
///
/// A semantic pass is added when no identifier was detected, or when the
/// query has more than `min_tokens` whitespace-delimited tokens. The
/// threshold is a tuning knob, not a derived constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticPassPolicy {
    pub min_tokens: usize,
}

impl SemanticPassPolicy {
    pub fn new(min_tokens: usize) -> Self {
        Self { min_tokens }
    }

    pub fn wants_semantic_pass(&self, query: &str, detected_ids: &[String]) -> bool {
        detected_ids.is_empty() || query.split_whitespace().count() > self.min_tokens
    }
}

impl Default for SemanticPassPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SEMANTIC_PASS_MIN_TOKENS)
    }
}

/// Turns (query, source) into an ordered list of retrieval steps
pub struct RetrievalPlanner {
    catalog: Arc<KnowledgeBaseCatalog>,
    detector: EntityIdDetector,
    policy: SemanticPassPolicy,
}

impl RetrievalPlanner {
    pub fn new(catalog: Arc<KnowledgeBaseCatalog>) -> Result<Self> {
        let detector = EntityIdDetector::from_catalog(&catalog)?;
        Ok(Self {
            catalog,
            detector,
            policy: SemanticPassPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: SemanticPassPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SemanticPassPolicy {
        self.policy
    }

    pub fn detector(&self) -> &EntityIdDetector {
        &self.detector
    }

    /// Steps for one source: identifier lookups first, then the semantic pass
    pub fn plan(&self, query: &str, source: &str) -> Result<Vec<RetrievalStep>> {
        let kb = self
            .catalog
            .get(source)
            .ok_or_else(|| SecDocsError::SourceNotFound(source.to_string()))?;

        let detected = self.detector.detect(query);

        let mut steps: Vec<RetrievalStep> = detected
            .iter()
            .filter_map(|id| {
                kb.field_for_prefix(EntityIdDetector::prefix_of(id))
                    .map(|field| RetrievalStep::metadata_filter(&kb.name, field, id))
            })
            .collect();

        // every source gets at least one attempt
        if self.policy.wants_semantic_pass(query, &detected) || steps.is_empty() {
            steps.push(RetrievalStep::semantic_search(&kb.name, query));
        }

        tracing::debug!(
            "Planned {} step(s) for '{}' ({} identifier(s) detected)",
            steps.len(),
            kb.name,
            detected.len()
        );

        Ok(steps)
    }

    /// Concatenated plans for every source, in the given order
    pub fn plan_all(&self, query: &str, sources: &[String]) -> Result<Vec<RetrievalStep>> {
        let mut master = Vec::new();
        for source in sources {
            master.extend(self.plan(query, source)?);
        }
        Ok(master)
    }
}
