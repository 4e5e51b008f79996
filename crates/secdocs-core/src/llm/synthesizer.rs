//! Final answer generation from fused context

use super::LLMClient;
use crate::error::{Result, SecDocsError};
use crate::search::Passage;
use std::sync::Arc;

/// Separator placed between passages in the assembled context
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const SYSTEM_PROMPT: &str = "You are a highly intelligent cybersecurity research analyst. \
Your primary task is to provide a comprehensive and accurate answer to the user's question, \
using the provided text excerpts as your primary source of truth.

Core Instructions:
1. Prioritize the Context: Your answer must be grounded in the facts and details found in the provided context.
2. Augment with Your Knowledge: You may use your own general knowledge to explain concepts and connect ideas, but it must not contradict the context.
3. Synthesize and Relate: If the context provides information from multiple sources, relate those pieces of information to each other.
4. Address the User Directly: Formulate the response as a direct, helpful answer to the user's question.";

/// Embeds fused passages in a fixed instructional frame and asks the model once
pub struct AnswerSynthesizer {
    client: Arc<dyn LLMClient>,
}

impl AnswerSynthesizer {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    /// Passage contents joined with [`CONTEXT_SEPARATOR`]
    pub fn assemble_context(passages: &[Passage]) -> String {
        passages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    pub fn build_prompt(query: &str, context: &str) -> String {
        format!(
            "System: {}\n\n--- Provided Context ---\n{}\n--- End of Context ---\n\nQuestion: {}\n\nAnswer:",
            SYSTEM_PROMPT, context, query
        )
    }

    /// Single completion call; a model error is fatal for the query
    pub async fn synthesize(&self, query: &str, passages: &[Passage]) -> Result<String> {
        let context = Self::assemble_context(passages);
        self.synthesize_prompt(&Self::build_prompt(query, &context)).await
    }

    /// Complete an already-built prompt
    pub async fn synthesize_prompt(&self, prompt: &str) -> Result<String> {
        tracing::info!("Synthesizing answer with {}", self.client.model_name());

        let answer = self
            .client
            .complete(prompt)
            .await
            .map_err(|e| SecDocsError::Synthesis(e.to_string()))?;

        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoClient {
        fail: bool,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LLMClient for EchoClient {
        async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
            self.seen.lock().unwrap().push(messages);
            if self.fail {
                Err(SecDocsError::ExternalError("HTTP 503".to_string()))
            } else {
                Ok("  Stored XSS is CWE-79.  ".to_string())
            }
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn passage(id: &str, content: &str) -> Passage {
        Passage {
            id: id.to_string(),
            content: content.to_string(),
            score: 1.0,
            source: "CWE".to_string(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_assemble_context() {
        let passages = vec![passage("a", "first"), passage("b", "second")];
        assert_eq!(
            AnswerSynthesizer::assemble_context(&passages),
            "first\n\n---\n\nsecond"
        );
        assert_eq!(AnswerSynthesizer::assemble_context(&[]), "");
    }

    #[test]
    fn test_prompt_frame() {
        let prompt = AnswerSynthesizer::build_prompt("What is XSS?", "ctx");
        assert!(prompt.starts_with("System: You are a highly intelligent"));
        assert!(prompt.contains("--- Provided Context ---\nctx\n--- End of Context ---"));
        assert!(prompt.ends_with("Question: What is XSS?\n\nAnswer:"));
    }

    #[tokio::test]
    async fn test_synthesize_calls_model_once() {
        let client = Arc::new(EchoClient {
            fail: false,
            seen: Mutex::new(vec![]),
        });
        let synthesizer = AnswerSynthesizer::new(client.clone());

        let answer = synthesizer
            .synthesize("What is XSS?", &[passage("a", "CWE-79 text")])
            .await
            .unwrap();

        assert_eq!(answer, "Stored XSS is CWE-79.");
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0][0].content.contains("CWE-79 text"));
    }

    #[tokio::test]
    async fn test_model_error_is_synthesis_error() {
        let synthesizer = AnswerSynthesizer::new(Arc::new(EchoClient {
            fail: true,
            seen: Mutex::new(vec![]),
        }));

        let err = synthesizer.synthesize("q", &[]).await.unwrap_err();
        assert!(matches!(err, SecDocsError::Synthesis(msg) if msg.contains("503")));
    }
}
