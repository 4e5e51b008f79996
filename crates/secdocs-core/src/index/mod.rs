//! Indexing pipeline
//!
//! Parsing, chunking and lazy, memoized per-source index handles.

mod chunker;
mod parser;
mod store;

pub use chunker::*;
pub use parser::*;
pub use store::*;

use crate::catalog::{KnowledgeBase, KnowledgeBaseCatalog};
use crate::error::{Result, SecDocsError};
use crate::search::Passage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Whether a handle can serve queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    /// Collection present with `passages` entries
    Ready { passages: usize },
    /// Empty or missing input; every query returns nothing
    Unusable { reason: String },
}

/// Queryable view over one knowledge base's collection
pub struct IndexHandle {
    source: String,
    collection: String,
    state: IndexState,
    store: Arc<dyn VectorStore>,
}

impl IndexHandle {
    fn ready(kb: &KnowledgeBase, store: Arc<dyn VectorStore>, passages: usize) -> Self {
        Self {
            source: kb.name.clone(),
            collection: kb.collection.clone(),
            state: IndexState::Ready { passages },
            store,
        }
    }

    fn unusable(kb: &KnowledgeBase, store: Arc<dyn VectorStore>, reason: impl Into<String>) -> Self {
        Self {
            source: kb.name.clone(),
            collection: kb.collection.clone(),
            state: IndexState::Unusable {
                reason: reason.into(),
            },
            store,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn state(&self) -> &IndexState {
        &self.state
    }

    pub fn is_usable(&self) -> bool {
        matches!(self.state, IndexState::Ready { .. })
    }

    /// Nearest passages to `text`; empty for an unusable handle
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Passage>> {
        if !self.is_usable() || top_k == 0 {
            return Ok(vec![]);
        }

        let hits = self.store.query(&self.collection, text, top_k, filter).await?;

        Ok(hits
            .into_iter()
            .map(|hit| Passage {
                id: hit.record.id,
                content: hit.record.content,
                score: hit.score,
                source: self.source.clone(),
                metadata: hit.record.metadata,
            })
            .collect())
    }
}

/// Build state for one source
#[derive(Default)]
struct BuildSlot {
    ready: OnceCell<Arc<IndexHandle>>,
    attempts: AtomicU64,
    /// Handle from the most recent failed attempt
    failed: tokio::sync::Mutex<Option<Arc<IndexHandle>>>,
}

/// Lazily built, memoized index handles keyed by source name.
///
/// The first `get` for a source opens its collection, or parses, chunks and
/// upserts the input file when the collection does not exist yet. Concurrent
/// calls for the same source wait on a single build and share its outcome.
/// A failed build is not memoized: callers arriving after it retry.
pub struct IndexCache {
    catalog: Arc<KnowledgeBaseCatalog>,
    store: Arc<dyn VectorStore>,
    parsers: ParserRegistry,
    docs_dir: PathBuf,
    handles: Mutex<HashMap<String, Arc<BuildSlot>>>,
}

impl IndexCache {
    pub fn new(
        catalog: Arc<KnowledgeBaseCatalog>,
        store: Arc<dyn VectorStore>,
        parsers: ParserRegistry,
        docs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            store,
            parsers,
            docs_dir: docs_dir.into(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<KnowledgeBaseCatalog> {
        &self.catalog
    }

    /// Handle for `source`, building it on first use
    pub async fn get(&self, source: &str) -> Result<Arc<IndexHandle>> {
        let kb = self
            .catalog
            .get(source)
            .ok_or_else(|| SecDocsError::SourceNotFound(source.to_string()))?;

        let slot = self.slot_for(&kb.name)?;
        if let Some(handle) = slot.ready.get() {
            return Ok(handle.clone());
        }

        let seen = slot.attempts.load(Ordering::SeqCst);
        let mut failed = slot.failed.lock().await;

        if let Some(handle) = slot.ready.get() {
            return Ok(handle.clone());
        }
        // queued behind an attempt that failed: share its outcome
        if slot.attempts.load(Ordering::SeqCst) != seen {
            if let Some(handle) = failed.as_ref() {
                return Ok(handle.clone());
            }
        }

        let outcome = self.open_or_build(kb).await;
        slot.attempts.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Ok(handle) => {
                *failed = None;
                let _ = slot.ready.set(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                tracing::warn!("Failed to build index for '{}': {}", kb.name, e);
                let handle = Arc::new(IndexHandle::unusable(
                    kb,
                    self.store.clone(),
                    e.to_string(),
                ));
                *failed = Some(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Handle if already initialized, without triggering a build
    pub fn peek(&self, source: &str) -> Option<Arc<IndexHandle>> {
        let handles = self.handles.lock().ok()?;
        handles.get(source).and_then(|slot| slot.ready.get().cloned())
    }

    fn slot_for(&self, name: &str) -> Result<Arc<BuildSlot>> {
        let mut handles = self
            .handles
            .lock()
            .map_err(|_| SecDocsError::Index("index cache lock poisoned".to_string()))?;
        Ok(handles.entry(name.to_string()).or_default().clone())
    }

    async fn open_or_build(&self, kb: &KnowledgeBase) -> Result<Arc<IndexHandle>> {
        if self.store.collection_exists(&kb.collection).await? {
            let passages = self.store.passage_count(&kb.collection).await?;
            tracing::info!(
                "Opening existing collection '{}' for {} ({} passages)",
                kb.collection,
                kb.name,
                passages
            );
            return Ok(Arc::new(IndexHandle::ready(kb, self.store.clone(), passages)));
        }

        let parser = self
            .parsers
            .get(&kb.parser)
            .ok_or_else(|| SecDocsError::ParserNotFound(kb.parser.clone()))?;

        let path = self.docs_dir.join(&kb.file);
        tracing::info!("Indexing '{}' from {}", kb.name, path.display());

        let records = parser.parse(&path, &kb.name).await?;
        if records.is_empty() {
            tracing::warn!("Parser produced no records for '{}', index unusable", kb.name);
            return Ok(Arc::new(IndexHandle::unusable(
                kb,
                self.store.clone(),
                "no records parsed",
            )));
        }

        let passages = apply_chunking(&kb.collection, &kb.chunking, &records);
        if passages.is_empty() {
            return Ok(Arc::new(IndexHandle::unusable(
                kb,
                self.store.clone(),
                "no passages after chunking",
            )));
        }

        let written = self.store.upsert(&kb.collection, &passages).await?;
        tracing::info!(
            "Indexed '{}': {} records, {} passages",
            kb.name,
            records.len(),
            written
        );

        Ok(Arc::new(IndexHandle::ready(kb, self.store.clone(), written)))
    }
}
