//! LLM integration
//!
//! Provides traits and implementations for:
//! - Chat completions and embeddings via OpenAI-compatible services (vLLM, Ollama, OpenAI...)
//! - Source routing
//! - Query expansion
//! - Reranking
//! - Answer synthesis

mod cache;
mod client;
mod http_embedder;
mod http_query_expander;
mod http_reranker;
mod list_literal;
mod router;
mod synthesizer;
mod traits;

pub use cache::{cache_key, LLMCache};
pub use client::{strip_reasoning, ChatMessage, LLMClient, VLLMClient};
pub use http_embedder::HttpEmbedder;
pub use http_query_expander::{HttpQueryExpander, DEFAULT_EXPANSION_TERMS};
pub use http_reranker::{HttpReranker, DEFAULT_RERANK_TOP_N};
pub use list_literal::extract_list_literal;
pub use router::{RoutingDecision, SourceRouter};
pub use synthesizer::{AnswerSynthesizer, CONTEXT_SEPARATOR};
pub use traits::*;
