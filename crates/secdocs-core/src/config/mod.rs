//! Configuration management

use crate::catalog::{KnowledgeBase, KnowledgeBaseCatalog};
use crate::error::{Result, SecDocsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the per-source input files
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// SQLite vector store location (defaults to the cache dir)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Small, fast model used for routing, expansion and reranking
    #[serde(default = "LLMServiceConfig::classifier_from_env")]
    pub classifier: LLMServiceConfig,

    /// Model used for the final answer
    #[serde(default = "LLMServiceConfig::synthesis_from_env")]
    pub synthesis: LLMServiceConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Replaces the built-in catalog when set
    #[serde(default)]
    pub knowledge_bases: Option<Vec<KnowledgeBase>>,

    /// Write one trace file per query into this directory
    #[serde(default)]
    pub query_log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            database_path: std::env::var("SECDOCS_DB").ok().map(PathBuf::from),
            classifier: LLMServiceConfig::classifier_from_env(),
            synthesis: LLMServiceConfig::synthesis_from_env(),
            retrieval: RetrievalConfig::default(),
            knowledge_bases: None,
            query_log_dir: None,
        }
    }
}

fn default_docs_dir() -> PathBuf {
    std::env::var("SECDOCS_DOCS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("docs"))
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of an OpenAI-compatible service (vLLM, Ollama, OpenAI...)
    pub url: String,

    /// Model name for chat completions
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions (will be auto-detected if not specified)
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    /// Classifier settings from `SECDOCS_LLM_*`
    pub fn classifier_from_env() -> Self {
        Self {
            url: std::env::var("SECDOCS_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: std::env::var("SECDOCS_LLM_MODEL").unwrap_or_else(|_| "qwen3:4b".to_string()),
            embedding_url: std::env::var("SECDOCS_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("SECDOCS_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("SECDOCS_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
            temperature: 0.1,
            max_tokens: default_max_tokens(),
        }
    }

    /// Synthesis settings from `SECDOCS_SYNTH_*`, falling back to the classifier's
    pub fn synthesis_from_env() -> Self {
        let classifier = Self::classifier_from_env();
        Self {
            url: std::env::var("SECDOCS_SYNTH_URL").unwrap_or(classifier.url.clone()),
            model: std::env::var("SECDOCS_SYNTH_MODEL")
                .unwrap_or_else(|_| "llama3.1:8b".to_string()),
            api_key: std::env::var("SECDOCS_SYNTH_API_KEY")
                .ok()
                .or(classifier.api_key.clone()),
            timeout_secs: 300,
            temperature: default_temperature(),
            max_tokens: 1024,
            ..classifier
        }
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self::classifier_from_env()
    }
}

fn default_embedding_model() -> String {
    std::env::var("SECDOCS_EMBEDDING_MODEL").unwrap_or_else(|_| "nomic-embed-text".to_string())
}

fn default_timeout() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

/// Knobs for planning, retrieval and fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Nearest neighbours per metadata-filtered lookup
    #[serde(default = "default_metadata_top_k")]
    pub metadata_top_k: usize,

    /// Nearest neighbours per semantic search term
    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,

    /// Related concepts requested from the expander
    #[serde(default = "default_expansion_terms")]
    pub expansion_terms: usize,

    /// Passages kept per source after reranking
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    /// Queries with more tokens than this always get a semantic pass
    #[serde(default = "default_semantic_pass_min_tokens")]
    pub semantic_pass_min_tokens: usize,

    /// Plan steps executed at the same time
    #[serde(default = "default_max_concurrent_steps")]
    pub max_concurrent_steps: usize,

    /// Deadline for a whole `answer` call
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            metadata_top_k: default_metadata_top_k(),
            semantic_top_k: default_semantic_top_k(),
            expansion_terms: default_expansion_terms(),
            rerank_top_n: default_rerank_top_n(),
            semantic_pass_min_tokens: default_semantic_pass_min_tokens(),
            max_concurrent_steps: default_max_concurrent_steps(),
            query_timeout_secs: None,
        }
    }
}

fn default_metadata_top_k() -> usize {
    20
}
fn default_semantic_top_k() -> usize {
    10
}
fn default_expansion_terms() -> usize {
    5
}
fn default_rerank_top_n() -> usize {
    5
}
fn default_semantic_pass_min_tokens() -> usize {
    5
}
fn default_max_concurrent_steps() -> usize {
    4
}

impl Config {
    /// Load config from `SECDOCS_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("SECDOCS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        Self::load_from(&path)
    }

    /// Load config from a path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Resolved vector store path
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::db::Database::default_path)
    }

    /// Catalog from config, or the built-in one
    pub fn catalog(&self) -> Result<KnowledgeBaseCatalog> {
        match &self.knowledge_bases {
            Some(sources) => KnowledgeBaseCatalog::new(sources.clone()),
            None => Ok(KnowledgeBaseCatalog::builtin()),
        }
    }

    fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.metadata_top_k == 0 || r.semantic_top_k == 0 {
            return Err(SecDocsError::Config(
                "retrieval top_k values must be positive".to_string(),
            ));
        }
        if r.rerank_top_n == 0 {
            return Err(SecDocsError::Config(
                "rerank_top_n must be positive".to_string(),
            ));
        }
        if r.max_concurrent_steps == 0 {
            return Err(SecDocsError::Config(
                "max_concurrent_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
