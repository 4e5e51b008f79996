//! Source file parsers
//!
//! Turns one knowledge base's input file into `{text, metadata}` records.
//! Format-specific ingestion (XML catalogs, ontologies, statutes) happens
//! upstream; these parsers read its hand-off formats.

use crate::error::{Result, SecDocsError};
use crate::search::SOURCE_DOCUMENT_FIELD;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One parsed record prior to chunking
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ParsedRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Parser trait - every registered input format implements this
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Registry key (e.g., "jsonl", "text")
    fn name(&self) -> &'static str;

    /// Parse `path` for the knowledge base `source`.
    ///
    /// A missing file yields no records rather than an error.
    async fn parse(&self, path: &Path, source: &str) -> Result<Vec<ParsedRecord>>;
}

async fn read_source_file(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Input file {} not found", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn tag_source(metadata: &mut serde_json::Map<String, serde_json::Value>, source: &str) {
    metadata
        .entry(SOURCE_DOCUMENT_FIELD)
        .or_insert_with(|| source.into());
}

/// One JSON object per line: `{"text": "...", "metadata": {...}}`
pub struct JsonlParser;

#[derive(Deserialize)]
struct JsonlLine {
    #[serde(alias = "content")]
    text: String,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl DocumentParser for JsonlParser {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn parse(&self, path: &Path, source: &str) -> Result<Vec<ParsedRecord>> {
        let Some(content) = read_source_file(path).await? else {
            return Ok(vec![]);
        };

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let parsed: JsonlLine = serde_json::from_str(line).map_err(|e| {
                SecDocsError::Parse(format!("{}:{}: {}", path.display(), idx + 1, e))
            })?;

            if parsed.text.trim().is_empty() {
                continue;
            }

            let mut metadata = parsed.metadata;
            tag_source(&mut metadata, source);
            records.push(ParsedRecord {
                text: parsed.text,
                metadata,
            });
        }

        tracing::debug!("Parsed {} records from {}", records.len(), path.display());
        Ok(records)
    }
}

/// Whole plain-text file as a single record
pub struct TextParser;

#[async_trait]
impl DocumentParser for TextParser {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn parse(&self, path: &Path, source: &str) -> Result<Vec<ParsedRecord>> {
        let Some(content) = read_source_file(path).await? else {
            return Ok(vec![]);
        };

        if content.trim().is_empty() {
            return Ok(vec![]);
        }

        let mut metadata = serde_json::Map::new();
        tag_source(&mut metadata, source);
        Ok(vec![ParsedRecord {
            text: content,
            metadata,
        }])
    }
}

/// Parsers keyed by name
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Registry with the `jsonl` and `text` parsers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonlParser));
        registry.register(Arc::new(TextParser));
        registry
    }

    /// Register a parser, replacing any existing one with the same name
    pub fn register(&mut self, parser: Arc<dyn DocumentParser>) {
        self.parsers.insert(parser.name().to_string(), parser);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DocumentParser>> {
        self.parsers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parsers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_jsonl_parser_fills_source_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cwe.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"text": "Improper Neutralization of Input", "metadata": {"cwe_id": "CWE-79"}}"#,
                "\n\n",
                r#"{"content": "SQL Injection", "metadata": {"cwe_id": "CWE-89", "source_document": "CWE v4.14"}}"#,
                "\n",
                r#"{"text": "   "}"#,
                "\n"
            ),
        )
        .unwrap();

        let records = JsonlParser.parse(&path, "CWE").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metadata["cwe_id"], "CWE-79");
        assert_eq!(records[0].metadata[SOURCE_DOCUMENT_FIELD], "CWE");
        assert_eq!(records[1].text, "SQL Injection");
        assert_eq!(records[1].metadata[SOURCE_DOCUMENT_FIELD], "CWE v4.14");
    }

    #[tokio::test]
    async fn test_jsonl_parser_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"text\": \"ok\"}\nnot json\n").unwrap();

        let err = JsonlParser.parse(&path, "CWE").await.unwrap_err();
        assert!(matches!(err, SecDocsError::Parse(msg) if msg.contains(":2:")));
    }

    #[tokio::test]
    async fn test_missing_file_yields_no_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.jsonl");

        assert!(JsonlParser.parse(&path, "CWE").await.unwrap().is_empty());
        assert!(TextParser.parse(&path, "GDPR").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_parser_single_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gdpr.txt");
        std::fs::write(&path, "Article 1\n\nSubject-matter and objectives").unwrap();

        let records = TextParser.parse(&path, "GDPR").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].text.starts_with("Article 1"));
        assert_eq!(records[0].metadata[SOURCE_DOCUMENT_FIELD], "GDPR");
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["jsonl", "text"]);
        assert!(registry.get("jsonl").is_some());
        assert!(registry.get("xml").is_none());
    }
}
