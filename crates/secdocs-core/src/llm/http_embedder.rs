//! HTTP-based embedder using external LLM service

use super::{Embedder, VLLMClient};
use crate::config::LLMServiceConfig;
use crate::error::{Result, SecDocsError};
use async_trait::async_trait;
use std::sync::Arc;

/// Embedder that uses an OpenAI-compatible `/v1/embeddings` endpoint
pub struct HttpEmbedder {
    client: Arc<VLLMClient>,
}

impl HttpEmbedder {
    pub fn new(client: Arc<VLLMClient>) -> Self {
        Self { client }
    }

    pub fn from_config(config: LLMServiceConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(VLLMClient::new(config)?)))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .embed_texts(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SecDocsError::Llm("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_texts(texts).await
    }

    fn dimensions(&self) -> usize {
        self.client.embedding_dimensions()
    }

    fn model_name(&self) -> &str {
        self.client.embedding_model()
    }
}
