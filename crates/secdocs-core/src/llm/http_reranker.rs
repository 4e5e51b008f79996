//! HTTP-based reranker using external LLM service

use super::{ChatMessage, LLMClient, RerankDocument, RerankResult, Reranker};
use crate::config::LLMServiceConfig;
use crate::error::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// Default number of passages kept per source
pub const DEFAULT_RERANK_TOP_N: usize = 5;

// Documents scored per LLM call; larger batches make small models lose count
const SCORE_BATCH_SIZE: usize = 10;
const SNIPPET_CHARS: usize = 300;
const FALLBACK_SCORE: f64 = 0.5;

/// Reranker that asks a chat model for 0-1 relevance scores
pub struct HttpReranker {
    client: Arc<dyn LLMClient>,
    top_n: usize,
}

impl HttpReranker {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            top_n: DEFAULT_RERANK_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    /// Create from configuration
    pub fn from_config(config: LLMServiceConfig) -> Result<Self> {
        let client = super::VLLMClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    async fn score_batch(&self, query: &str, batch: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        let messages = vec![
            ChatMessage::system(
                "Score document relevance to query. Output ONLY JSON: {\"scores\": [0.0-1.0, ...]} with one score per document, in order.",
            ),
            ChatMessage::user(build_reranking_prompt(query, batch)),
        ];

        let response = self.client.chat_completion(messages).await?;
        Ok(parse_reranking_response(&response, batch))
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let batches = documents
            .chunks(SCORE_BATCH_SIZE)
            .map(|batch| self.score_batch(query, batch));
        let mut scored: Vec<RerankResult> = try_join_all(batches).await?.into_iter().flatten().collect();

        // stable: equal scores keep retrieval order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_n);

        Ok(scored)
    }

    fn max_output(&self) -> usize {
        self.top_n
    }

    fn model_name(&self) -> &str {
        self.client.model_name()
    }
}

fn build_reranking_prompt(query: &str, documents: &[RerankDocument]) -> String {
    let mut prompt = format!(
        r#"Q: "{}"
Docs:
"#,
        query
    );

    for (idx, doc) in documents.iter().enumerate() {
        let snippet: String = doc.text.chars().take(SNIPPET_CHARS).collect();
        prompt.push_str(&format!("[{}] {}\n", idx, snippet.replace('\n', " ")));
    }

    prompt.push_str(&format!(
        r#"
Score each of the {} docs 0-1 JSON:
{{"scores":[0.0,...]}}
"#,
        documents.len()
    ));

    prompt
}

fn fallback_scores(documents: &[RerankDocument]) -> Vec<RerankResult> {
    documents
        .iter()
        .map(|doc| RerankResult {
            id: doc.id.clone(),
            score: FALLBACK_SCORE,
        })
        .collect()
}

fn parse_reranking_response(response: &str, documents: &[RerankDocument]) -> Vec<RerankResult> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            tracing::warn!("No JSON in reranking response, using fallback scores");
            return fallback_scores(documents);
        }
    };

    let parsed_json: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to parse reranking JSON: {}, using fallback scores", e);
            tracing::debug!("Raw LLM response: {}", response);
            return fallback_scores(documents);
        }
    };

    // {"scores": [0.9, 0.7, ...]} by index
    let Some(arr) = parsed_json["scores"].as_array() else {
        return fallback_scores(documents);
    };

    documents
        .iter()
        .enumerate()
        .map(|(idx, doc)| RerankResult {
            id: doc.id.clone(),
            score: arr
                .get(idx)
                .and_then(|v| v.as_f64())
                .map(|s| s.clamp(0.0, 1.0))
                .unwrap_or(FALLBACK_SCORE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecDocsError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClient {
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LLMClient for FixedClient {
        async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct DownClient;

    #[async_trait]
    impl LLMClient for DownClient {
        async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            Err(SecDocsError::Llm("unreachable".to_string()))
        }

        fn model_name(&self) -> &str {
            "down"
        }
    }

    fn docs(n: usize) -> Vec<RerankDocument> {
        (0..n)
            .map(|i| RerankDocument {
                id: format!("p{}", i),
                text: format!("passage {}", i),
            })
            .collect()
    }

    fn fixed(reply: &str) -> Arc<FixedClient> {
        Arc::new(FixedClient {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_rerank_orders_by_score() {
        let reranker = HttpReranker::new(fixed(r#"{"scores": [0.1, 0.9, 0.5]}"#));
        let results = reranker.rerank("q", &docs(3)).await.unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p0"]);
    }

    #[tokio::test]
    async fn test_rerank_bounded_by_top_n() {
        let reranker = HttpReranker::new(fixed("no idea")).with_top_n(2);
        let results = reranker.rerank("q", &docs(4)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(reranker.max_output(), 2);
        // fallback scores are equal, so retrieval order survives
        assert_eq!(results[0].id, "p0");
        assert_eq!(results[1].id, "p1");
    }

    #[tokio::test]
    async fn test_rerank_batches_large_inputs() {
        let client = fixed(r#"{"scores": []}"#);
        let reranker = HttpReranker::new(client.clone());
        reranker.rerank("q", &docs(25)).await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rerank_empty_input() {
        let client = fixed("{}");
        let reranker = HttpReranker::new(client.clone());
        assert!(reranker.rerank("q", &[]).await.unwrap().is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rerank_propagates_client_error() {
        let reranker = HttpReranker::new(Arc::new(DownClient));
        assert!(reranker.rerank("q", &docs(2)).await.is_err());
    }

    #[test]
    fn test_prompt_truncates_on_char_boundary() {
        let doc = RerankDocument {
            id: "x".to_string(),
            text: "é".repeat(1000),
        };
        let prompt = build_reranking_prompt("q", &[doc]);
        assert!(prompt.contains(&"é".repeat(SNIPPET_CHARS)));
        assert!(!prompt.contains(&"é".repeat(SNIPPET_CHARS + 1)));
    }

    #[test]
    fn test_parse_clamps_scores() {
        let results = parse_reranking_response(r#"{"scores": [4.0, -1]}"#, &docs(2));
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[1].score, 0.0);
    }
}
