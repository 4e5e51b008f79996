//! HTTP client for external LLM services (vLLM, Ollama, OpenAI, etc.)

use crate::config::LLMServiceConfig;
use crate::error::{Result, SecDocsError};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::cache::{cache_key, LLMCache};

lazy_static! {
    // unterminated blocks run to the end of the output
    static ref THINK_BLOCK_RE: Regex = Regex::new(r"(?s)<think>.*?(?:</think>|\z)").unwrap();
}

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Single-prompt completion
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat_completion(vec![ChatMessage::user(prompt)]).await
    }

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    embedding_dimensions: usize,
    cache: Arc<LLMCache>,
}

impl VLLMClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SecDocsError::Http)?;

        // nomic-embed-text
        let embedding_dimensions = config.embedding_dimensions.unwrap_or(768);

        Ok(Self {
            http_client,
            config,
            embedding_dimensions,
            cache: Arc::new(LLMCache::new()),
        })
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    /// Embed a batch of texts through `/v1/embeddings`, using the cache per text
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = cache_key("embed", &self.config.embedding_model, text);
            if let Some(embedding) = self
                .cache
                .get(&key)
                .and_then(|cached| serde_json::from_str::<Vec<f32>>(&cached).ok())
            {
                results.push(Some(embedding));
                continue;
            }
            results.push(None);
            uncached_texts.push(text.clone());
            uncached_indices.push(i);
        }

        if !uncached_texts.is_empty() {
            tracing::debug!(
                "Embedding batch: {} cached, {} to fetch",
                texts.len() - uncached_texts.len(),
                uncached_texts.len()
            );

            #[derive(Serialize)]
            struct EmbedRequest<'a> {
                model: &'a str,
                input: &'a [String],
            }

            #[derive(Deserialize)]
            struct EmbedResponse {
                data: Vec<EmbedData>,
            }

            #[derive(Deserialize)]
            struct EmbedData {
                embedding: Vec<f32>,
            }

            let request = EmbedRequest {
                model: &self.config.embedding_model,
                input: &uncached_texts,
            };

            let url = format!("{}/v1/embeddings", self.config.embeddings_url());
            let response = self
                .authorize(self.http_client.post(&url).json(&request))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(SecDocsError::ExternalError(format!(
                    "Embedding service error (HTTP {}): {}",
                    status, body
                )));
            }

            let embed_response: EmbedResponse = response.json().await?;

            if embed_response.data.len() != uncached_texts.len() {
                return Err(SecDocsError::ExternalError(format!(
                    "Embedding service returned {} vectors for {} inputs",
                    embed_response.data.len(),
                    uncached_texts.len()
                )));
            }

            for ((data, idx), text) in embed_response
                .data
                .into_iter()
                .zip(uncached_indices)
                .zip(&uncached_texts)
            {
                if let Ok(json) = serde_json::to_string(&data.embedding) {
                    self.cache
                        .set(cache_key("embed", &self.config.embedding_model, text), json);
                }
                results[idx] = Some(data.embedding);
            }
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| SecDocsError::Llm("Missing embedding in batch".to_string())))
            .collect()
    }
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let messages_json = serde_json::to_string(&messages)?;
        let key = cache_key("chat", &self.config.model, &messages_json);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Cache hit for chat completion");
            return Ok(cached);
        }

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.config.url);

        let response = self
            .authorize(self.http_client.post(&url).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SecDocsError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| strip_reasoning(&choice.message.content))
            .ok_or_else(|| SecDocsError::Llm("No response from LLM".to_string()))?;

        self.cache.set(key, content.clone());

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Drop `<think>...</think>` blocks emitted by reasoning models
pub fn strip_reasoning(content: &str) -> String {
    THINK_BLOCK_RE.replace_all(content, "").trim().to_string()
}
