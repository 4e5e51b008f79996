//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use secdocs_core::error::{Result, SecDocsError};
use secdocs_core::index::JsonlParser;
use secdocs_core::llm::ChatMessage;
use secdocs_core::{
    Database, DocumentParser, Embedder, IndexCache, KnowledgeBaseCatalog, LLMClient,
    ParsedRecord, ParserRegistry, RagEngine, RetrievalConfig,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DIMS: usize = 64;

/// Bag-of-words hashed into a fixed number of buckets
pub struct HashEmbedder;

fn bucket(word: &str) -> usize {
    word.bytes()
        .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
        % DIMS
}

pub fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
    {
        v[bucket(word)] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model_name(&self) -> &str {
        "hash-bow"
    }
}

/// Which pipeline stage a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Routing,
    Expansion,
    Rerank,
    Synthesis,
}

fn stage_of(prompt: &str) -> Stage {
    if prompt.starts_with("Select the document(s)") {
        Stage::Routing
    } else if prompt.starts_with("Based on the user's query") {
        Stage::Expansion
    } else if prompt.starts_with("Q: ") {
        Stage::Rerank
    } else {
        Stage::Synthesis
    }
}

/// Canned responses per stage; records every prompt it sees
pub struct ScriptedLlm {
    pub routing: String,
    pub expansion: String,
    pub answer: String,
    pub fail_routing: bool,
    pub fail_synthesis: bool,
    pub synthesis_delay: Option<Duration>,
    prompts: Mutex<Vec<(Stage, String)>>,
}

impl ScriptedLlm {
    pub fn routing_to(response: &str) -> Self {
        Self {
            routing: response.to_string(),
            expansion: r#"["cross-site scripting", "input validation"]"#.to_string(),
            answer: "Grounded answer.".to_string(),
            fail_routing: false,
            fail_synthesis: false,
            synthesis_delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self, stage: Stage) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn calls(&self, stage: Stage) -> usize {
        self.prompts(stage).len()
    }
}

/// Scores decrease with position so reranking keeps retrieval order
fn rerank_response(prompt: &str) -> String {
    let docs = prompt.lines().filter(|l| l.starts_with('[')).count();
    let scores: Vec<String> = (0..docs)
        .map(|i| format!("{:.2}", 0.9 - i as f64 * 0.05))
        .collect();
    format!(r#"{{"scores":[{}]}}"#, scores.join(","))
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let stage = stage_of(&prompt);
        self.prompts.lock().unwrap().push((stage, prompt.clone()));

        match stage {
            Stage::Routing if self.fail_routing => {
                Err(SecDocsError::Llm("connection refused".to_string()))
            }
            Stage::Routing => Ok(self.routing.clone()),
            Stage::Expansion => Ok(self.expansion.clone()),
            Stage::Rerank => Ok(rerank_response(&prompt)),
            Stage::Synthesis => {
                if let Some(delay) = self.synthesis_delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail_synthesis {
                    Err(SecDocsError::Llm("synthesis model offline".to_string()))
                } else {
                    Ok(self.answer.clone())
                }
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// JSONL parser that counts invocations and can be slowed down
pub struct CountingParser {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl CountingParser {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentParser for CountingParser {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn parse(&self, path: &Path, source: &str) -> Result<Vec<ParsedRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        JsonlParser.parse(path, source).await
    }
}

/// Small fixtures for CWE, GDPR and NIST CSF 2.0
pub fn write_docs(dir: &Path) {
    std::fs::write(
        dir.join("cwec_latest.jsonl"),
        r#"{"text": "CWE-79: Improper Neutralization of Input During Web Page Generation ('Cross-site Scripting'). Attackers inject script into pages viewed by other users.", "metadata": {"cwe_id": "CWE-79"}}
{"text": "CWE-89: Improper Neutralization of Special Elements used in an SQL Command ('SQL Injection').", "metadata": {"cwe_id": "CWE-89"}}
{"text": "CWE-352: Cross-Site Request Forgery (CSRF). The application does not verify that a request was intentionally sent.", "metadata": {"cwe_id": "CWE-352"}}
"#,
    )
    .unwrap();

    std::fs::write(
        dir.join("GDPR.jsonl"),
        r#"{"text": "Article 4: 'personal data' means any information relating to an identified or identifiable natural person.", "metadata": {"article": "4"}}
{"text": "Article 17: The data subject shall have the right to obtain the erasure of personal data concerning him or her without undue delay.", "metadata": {"article": "17"}}
{"text": "Article 32: The controller shall implement appropriate technical measures including access control to ensure security of processing of personal data.", "metadata": {"article": "32"}}
"#,
    )
    .unwrap();

    std::fs::write(
        dir.join("NISTCSWP29.jsonl"),
        r#"{"text": "PR.AA-05: Access permissions, entitlements, and authorizations are defined in a policy, managed, enforced, and reviewed.", "metadata": {"subcategory_id": "PR.AA-05"}}
{"text": "GV.OC-01: The organizational mission is understood and informs cybersecurity risk management.", "metadata": {"subcategory_id": "GV.OC-01"}}
{"text": "DE.CM-01: Networks and network services are monitored to find potentially adverse events.", "metadata": {"subcategory_id": "DE.CM-01"}}
"#,
    )
    .unwrap();
}

pub fn in_memory_store() -> Arc<Database> {
    let db = Database::open_in_memory(Arc::new(HashEmbedder)).unwrap();
    db.initialize().unwrap();
    Arc::new(db)
}

pub fn index_cache(docs_dir: &Path, parsers: ParserRegistry) -> Arc<IndexCache> {
    Arc::new(IndexCache::new(
        Arc::new(KnowledgeBaseCatalog::builtin()),
        in_memory_store(),
        parsers,
        docs_dir.to_path_buf(),
    ))
}

/// Engine over the built-in catalog, an in-memory store and one scripted model
pub fn engine(docs_dir: &Path, llm: Arc<ScriptedLlm>) -> RagEngine {
    let cache = index_cache(docs_dir, ParserRegistry::with_defaults());
    RagEngine::new(
        cache.catalog().clone(),
        cache,
        llm.clone(),
        llm,
        &RetrievalConfig::default(),
    )
    .unwrap()
}
