//! Knowledge base catalog
//!
//! Static registry of the reference collections the engine can search, with
//! the identifier taxonomy each one exposes for exact-match lookups.
//! The catalog is built once at startup and only read afterwards.

mod builtin;

pub use builtin::builtin_knowledge_bases;

use crate::error::{Result, SecDocsError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Chunk size for already-granular catalogs (one weakness, one control...)
pub const GRANULAR_CHUNK_CHARS: usize = 8192;

/// Window size for long-form narrative sources
pub const WINDOW_CHUNK_CHARS: usize = 512;

/// Overlap between consecutive windows
pub const WINDOW_OVERLAP_CHARS: usize = 50;

/// Grouping used when describing sources to the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Regulations,
    Frameworks,
    ThreatIntelligence,
    Basics,
}

impl SourceCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Regulations => "Regulations",
            Self::Frameworks => "Frameworks",
            Self::ThreatIntelligence => "Threat Intelligence",
            Self::Basics => "Basics",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Regulations => {
                "Legal and regulatory mandates. Use for questions on legal obligations and compliance."
            }
            Self::Frameworks => {
                "Security control standards. Use for questions on implementing security programs and risk management."
            }
            Self::ThreatIntelligence => {
                "Technical catalogs of weaknesses, attack patterns and defenses. Use for questions on how attacks work and technical countermeasures."
            }
            Self::Basics => {
                "Foundational knowledge for general questions about secure software development principles."
            }
        }
    }
}

/// How a source's parsed records are split before indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChunkingPolicy {
    /// Large overlap-free blocks; records are already self-contained
    Granular { chunk_size: usize },
    /// Small overlapping windows over long narrative text
    Windowed { chunk_size: usize, overlap: usize },
}

impl ChunkingPolicy {
    pub fn granular() -> Self {
        Self::Granular {
            chunk_size: GRANULAR_CHUNK_CHARS,
        }
    }

    pub fn windowed() -> Self {
        Self::Windowed {
            chunk_size: WINDOW_CHUNK_CHARS,
            overlap: WINDOW_OVERLAP_CHARS,
        }
    }
}

fn default_parser() -> String {
    "jsonl".to_string()
}

/// One reference document collection with its own backing index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Short identity used by the router and in passage tags
    pub name: String,

    /// Longer human name (e.g. "CWE (Common Weakness Enumeration)")
    #[serde(default)]
    pub display_name: Option<String>,

    /// Natural-language description shown to the router
    pub description: String,

    pub category: SourceCategory,

    /// Vector store collection holding this source's passages
    pub collection: String,

    /// Name of the parser in the parser registry
    #[serde(default = "default_parser")]
    pub parser: String,

    /// Input file, relative to the configured docs directory
    pub file: PathBuf,

    pub chunking: ChunkingPolicy,

    /// Identifier prefix (uppercase) -> metadata field used for exact filtering
    #[serde(default)]
    pub identifier_prefixes: BTreeMap<String, String>,

    /// Questions used by `secdocs eval`
    #[serde(default)]
    pub sample_questions: Vec<String>,
}

impl KnowledgeBase {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Metadata field for an identifier prefix within this source
    pub fn field_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.identifier_prefixes
            .get(&prefix.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Case-insensitive match on name or display name
    fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name)
            || self
                .display_name
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(name))
    }
}

/// Read-only registry of knowledge bases, in declaration order
#[derive(Debug, Clone)]
pub struct KnowledgeBaseCatalog {
    sources: Vec<KnowledgeBase>,
}

impl KnowledgeBaseCatalog {
    /// Build a catalog, validating names, collections and taxonomy
    pub fn new(sources: Vec<KnowledgeBase>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut collections = HashSet::new();
        let mut prefix_fields: BTreeMap<String, String> = BTreeMap::new();

        for kb in &sources {
            if kb.name.trim().is_empty() {
                return Err(SecDocsError::Config(
                    "knowledge base with empty name".to_string(),
                ));
            }
            if !names.insert(kb.name.to_ascii_lowercase()) {
                return Err(SecDocsError::Config(format!(
                    "duplicate knowledge base name: {}",
                    kb.name
                )));
            }
            if !collections.insert(kb.collection.clone()) {
                return Err(SecDocsError::Config(format!(
                    "collection '{}' is used by more than one knowledge base",
                    kb.collection
                )));
            }

            for (prefix, field) in &kb.identifier_prefixes {
                if prefix.is_empty()
                    || !prefix
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
                {
                    return Err(SecDocsError::Config(format!(
                        "identifier prefix '{}' of {} must be uppercase alphanumeric",
                        prefix, kb.name
                    )));
                }
                if let Some(existing) = prefix_fields.get(prefix) {
                    if existing != field {
                        return Err(SecDocsError::Config(format!(
                            "identifier prefix '{}' maps to both '{}' and '{}'",
                            prefix, existing, field
                        )));
                    }
                }
                prefix_fields.insert(prefix.clone(), field.clone());
            }
        }

        Ok(Self { sources })
    }

    /// The built-in cybersecurity catalog
    pub fn builtin() -> Self {
        Self {
            sources: builtin_knowledge_bases(),
        }
    }

    /// Source name -> description
    pub fn describe(&self) -> BTreeMap<String, String> {
        self.sources
            .iter()
            .map(|kb| (kb.name.clone(), kb.description.clone()))
            .collect()
    }

    /// Union of all sources' identifier taxonomies
    pub fn identifier_prefix_map(&self) -> BTreeMap<String, String> {
        self.sources
            .iter()
            .flat_map(|kb| kb.identifier_prefixes.clone())
            .collect()
    }

    /// Exact lookup by name. Unknown names are `None`, never a default.
    pub fn get(&self, name: &str) -> Option<&KnowledgeBase> {
        self.sources.iter().find(|kb| kb.name == name)
    }

    /// Lenient lookup used on model output (case, display names)
    pub fn resolve(&self, name: &str) -> Option<&KnowledgeBase> {
        self.get(name)
            .or_else(|| self.sources.iter().find(|kb| kb.answers_to(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|kb| kb.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeBase> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for KnowledgeBaseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
