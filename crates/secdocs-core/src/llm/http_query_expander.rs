//! HTTP-based query expander using external LLM service

use super::list_literal::extract_list_literal;
use super::{ChatMessage, LLMClient, QueryExpander};
use crate::config::LLMServiceConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Number of related terms requested per query
pub const DEFAULT_EXPANSION_TERMS: usize = 5;

/// Query expander using external HTTP LLM service
pub struct HttpQueryExpander {
    client: Arc<dyn LLMClient>,
    terms: usize,
}

impl HttpQueryExpander {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            terms: DEFAULT_EXPANSION_TERMS,
        }
    }

    /// Request `terms` related concepts instead of the default
    pub fn with_terms(mut self, terms: usize) -> Self {
        self.terms = terms.max(1);
        self
    }

    /// Create from configuration
    pub fn from_config(config: LLMServiceConfig) -> Result<Self> {
        let client = super::VLLMClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }
}

#[async_trait]
impl QueryExpander for HttpQueryExpander {
    async fn expand(&self, query: &str) -> Vec<String> {
        let messages = vec![
            ChatMessage::system(
                "You are a cybersecurity domain expert helping a vector database search. \
                 Output ONLY a JSON list of strings.",
            ),
            ChatMessage::user(build_expansion_prompt(query, self.terms)),
        ];

        let response = match self.client.chat_completion(messages).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Query expansion failed: {}, using unexpanded query", e);
                return vec![query.to_string()];
            }
        };

        match extract_list_literal(&response) {
            Some(terms) => {
                let expanded = merge_terms(query, terms);
                tracing::debug!("Expanded query into {} terms", expanded.len());
                expanded
            }
            None => {
                tracing::warn!("Failed to parse expansion list, using unexpanded query");
                tracing::debug!("Raw LLM response: {}", response);
                vec![query.to_string()]
            }
        }
    }

    fn model_name(&self) -> &str {
        self.client.model_name()
    }
}

fn build_expansion_prompt(query: &str, terms: usize) -> String {
    format!(
        r#"Based on the user's query, generate a list of {} related technical concepts or synonyms for a vector database search.

User query: "{}"

Example:
Query: "what are the best controls for ransomware?"
Response: ["data backup and recovery", "preventing unauthorized execution", "malware detection", "attack surface reduction", "incident response playbooks"]

Respond with only a JSON list of strings."#,
        terms, query
    )
}

/// Original query first, then new terms; case-insensitive duplicates dropped
fn merge_terms(query: &str, terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(query.to_string())
        .chain(terms)
        .filter(|term| seen.insert(term.trim().to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecDocsError;
    use std::sync::Mutex;

    struct ScriptedClient {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(vec![]),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                reply: Err(msg.to_string()),
                prompts: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            self.reply.clone().map_err(SecDocsError::Llm)
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_expand_unions_query_and_terms() {
        let client = Arc::new(ScriptedClient::replying(
            "Here you go: [\"malware detection\", \"data backup\", \"Malware Detection\"]",
        ));
        let expander = HttpQueryExpander::new(client.clone());

        let terms = expander.expand("ransomware controls").await;
        assert_eq!(
            terms,
            vec!["ransomware controls", "malware detection", "data backup"]
        );

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("list of 5 related"));
        assert!(prompts[0].contains("ransomware controls"));
    }

    #[tokio::test]
    async fn test_unparseable_response_falls_back_to_query() {
        let expander = HttpQueryExpander::new(Arc::new(ScriptedClient::replying(
            "I would suggest looking at backups.",
        )));
        assert_eq!(expander.expand("backup policy").await, vec!["backup policy"]);
    }

    #[tokio::test]
    async fn test_client_error_falls_back_to_query() {
        let expander = HttpQueryExpander::new(Arc::new(ScriptedClient::failing("connection refused")));
        assert_eq!(expander.expand("backup policy").await, vec!["backup policy"]);
    }

    #[tokio::test]
    async fn test_with_terms_changes_prompt() {
        let client = Arc::new(ScriptedClient::replying("[]"));
        let expander = HttpQueryExpander::new(client.clone()).with_terms(3);

        assert_eq!(expander.expand("phishing").await, vec!["phishing"]);
        assert!(client.prompts.lock().unwrap()[0].contains("list of 3 related"));
    }

    #[test]
    fn test_merge_terms_keeps_query_first() {
        let merged = merge_terms(
            "access control",
            vec!["Access Control".to_string(), "least privilege".to_string()],
        );
        assert_eq!(merged, vec!["access control", "least privilege"]);
    }
}
