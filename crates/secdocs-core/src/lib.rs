//! SecDocs Core Library
//!
//! Retrieval orchestration for question answering over a fixed catalog of
//! cybersecurity knowledge bases.
//!
//! # Features
//! - LLM-driven source routing over a declarative catalog
//! - Identifier-aware planning (CWE-79, AC-2, T1059.001...) with metadata filters
//! - Lazy, single-flight per-source indexing into a SQLite vector store
//! - Query expansion, concurrent plan execution and per-source reranking
//! - Grounded answer synthesis with per-query JSONL traces

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod llm;
pub mod search;

pub use catalog::{ChunkingPolicy, KnowledgeBase, KnowledgeBaseCatalog, SourceCategory};
pub use config::{Config, LLMServiceConfig, RetrievalConfig};
pub use db::{CollectionInfo, Database};
pub use error::{Error, Result, SecDocsError};
pub use index::{
    DocumentParser, IndexCache, IndexHandle, IndexState, MetadataFilter, ParsedRecord,
    ParserRegistry, PassageRecord, VectorStore,
};
pub use llm::{
    AnswerSynthesizer, ChatMessage, Embedder, HttpEmbedder, HttpQueryExpander, HttpReranker,
    LLMClient, QueryExpander, Reranker, RoutingDecision, SourceRouter, VLLMClient,
};
pub use search::{
    AnswerOutcome, EntityIdDetector, Passage, QueryPlan, QueryResult, RagEngine,
    RetrievalExecutor, RetrievalPlanner, RetrievalStep, SemanticPassPolicy, SourceFairReranker,
};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "secdocs";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "secdocs";
