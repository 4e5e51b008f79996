//! LLM-backed source selection
//!
//! Asks the classification model which knowledge bases are relevant to a
//! query. The prompt carries the catalog descriptions plus fixed expert
//! rules, because unconstrained selection over- or under-selects sources
//! that merely sound related.

use super::list_literal::extract_list_literal;
use super::{ChatMessage, LLMClient};
use crate::catalog::{KnowledgeBaseCatalog, SourceCategory};
use crate::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of one routing call
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Catalog names, in the order the model listed them
    pub sources: Vec<String>,
    /// Unmodified model output
    pub raw_response: String,
    /// Whether a list literal was found at all
    pub parsed: bool,
}

/// Selects relevant knowledge bases for a query
pub struct SourceRouter {
    client: Arc<dyn LLMClient>,
    catalog: Arc<KnowledgeBaseCatalog>,
}

impl SourceRouter {
    pub fn new(client: Arc<dyn LLMClient>, catalog: Arc<KnowledgeBaseCatalog>) -> Self {
        Self { client, catalog }
    }

    /// Selected source names; empty when nothing could be determined
    pub async fn select(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.route(query).await?.sources)
    }

    /// Full routing decision including the raw response
    pub async fn route(&self, query: &str) -> Result<RoutingDecision> {
        let prompt = build_routing_prompt(&self.catalog, query);

        let messages = vec![
            ChatMessage::system(
                "You are an expert query analyst for a cybersecurity reference library. \
                 Respond ONLY with a JSON list of document names.",
            ),
            ChatMessage::user(prompt),
        ];

        let raw_response = self.client.chat_completion(messages).await?;

        let Some(names) = extract_list_literal(&raw_response) else {
            tracing::warn!(
                "Router returned no parseable list, selecting no sources. Raw response: {}",
                response_preview(&raw_response)
            );
            return Ok(RoutingDecision {
                sources: vec![],
                raw_response,
                parsed: false,
            });
        };

        let sources = resolve_selection(&self.catalog, &names);
        tracing::info!("Router selected {:?}", sources);

        Ok(RoutingDecision {
            sources,
            raw_response,
            parsed: true,
        })
    }
}

const RAW_PREVIEW_CHARS: usize = 200;

/// First few hundred characters of a model response, on one line
fn response_preview(raw: &str) -> String {
    let flat = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= RAW_PREVIEW_CHARS {
        return flat;
    }
    let head: String = flat.chars().take(RAW_PREVIEW_CHARS).collect();
    format!("{}...", head)
}

/// Map model-provided names onto catalog names, dropping unknowns and repeats
fn resolve_selection(catalog: &KnowledgeBaseCatalog, names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for name in names {
        match catalog.resolve(name) {
            Some(kb) => {
                if seen.insert(kb.name.clone()) {
                    sources.push(kb.name.clone());
                }
            }
            None => tracing::warn!("Router selected unknown source '{}', ignoring", name),
        }
    }

    sources
}

fn names_in(catalog: &KnowledgeBaseCatalog, category: SourceCategory) -> Vec<String> {
    catalog
        .iter()
        .filter(|kb| kb.category == category)
        .map(|kb| format!("\"{}\"", kb.name))
        .collect()
}

fn is_data_protection(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("data protection") || lower.contains("privacy")
}

/// Expert disambiguation rules derived from the catalog's categories
fn routing_rules(catalog: &KnowledgeBaseCatalog) -> Vec<String> {
    let mut rules = vec![
        "If the query relates concepts from different documents (e.g. a weakness and a control framework), you MUST select every corresponding document.".to_string(),
    ];

    let data_protection: Vec<&str> = catalog
        .iter()
        .filter(|kb| kb.category == SourceCategory::Regulations && is_data_protection(&kb.description))
        .map(|kb| kb.name.as_str())
        .collect();

    if !data_protection.is_empty() {
        rules.push(format!(
            "If the query mentions personal data, PII, privacy or data subjects, ALWAYS include {}.",
            data_protection
                .iter()
                .map(|n| format!("\"{}\"", n))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let sector_regulations: Vec<String> = catalog
        .iter()
        .filter(|kb| kb.category == SourceCategory::Regulations && !is_data_protection(&kb.description))
        .map(|kb| format!("\"{}\" ({})", kb.name, kb.description))
        .collect();

    if !sector_regulations.is_empty() {
        rules.push(format!(
            "Sector-specific regulations are included ONLY when the query explicitly names the regulation or its sector: {}.",
            sector_regulations.join("; ")
        ));
    }

    let threat_intel = names_in(catalog, SourceCategory::ThreatIntelligence);
    if !threat_intel.is_empty() {
        rules.push(format!(
            "If the query is about vulnerabilities, weaknesses, attack patterns, exploits or technical countermeasures, select {} together.",
            threat_intel.join(", ")
        ));
    }

    let frameworks = names_in(catalog, SourceCategory::Frameworks);
    if !frameworks.is_empty() {
        rules.push(format!(
            "If the query is about security controls in general (not one specific framework), select {} together.",
            frameworks.join(", ")
        ));
    }

    rules.push(
        "If a query names one specific document or identifier (e.g. CWE-79, AC-2), that document must be selected.".to_string(),
    );
    rules.push(
        "For any other general question, select only the single best document.".to_string(),
    );

    rules
}

fn build_routing_prompt(catalog: &KnowledgeBaseCatalog, query: &str) -> String {
    let mut documents = String::new();
    for category in [
        SourceCategory::Regulations,
        SourceCategory::Frameworks,
        SourceCategory::ThreatIntelligence,
        SourceCategory::Basics,
    ] {
        let members: Vec<_> = catalog.iter().filter(|kb| kb.category == category).collect();
        if members.is_empty() {
            continue;
        }
        documents.push_str(&format!(
            "\n{} - {}\n",
            category.label(),
            category.description()
        ));
        for kb in members {
            documents.push_str(&format!("- \"{}\": {}\n", kb.name, kb.description));
        }
    }

    let rules = routing_rules(catalog)
        .iter()
        .enumerate()
        .map(|(i, rule)| format!("{}. {}", i + 1, rule))
        .collect::<Vec<_>>()
        .join("\n");

    let example: Vec<String> = catalog
        .iter()
        .take(2)
        .map(|kb| format!("\"{}\"", kb.name))
        .collect();

    format!(
        r#"Select the document(s) needed to answer the user's query.

Available documents:{}
User query: "{}"

Rules:
{}

Respond with only a JSON list of the selected document names, exactly as written above. Example: [{}]"#,
        documents,
        query,
        rules,
        example.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_catalog_and_query() {
        let catalog = KnowledgeBaseCatalog::builtin();
        let prompt = build_routing_prompt(&catalog, "What is CWE-79?");
        assert!(prompt.contains("\"CWE\""));
        assert!(prompt.contains("\"NIST CSF 2.0\""));
        assert!(prompt.contains("What is CWE-79?"));
        assert!(prompt.contains("Threat Intelligence"));
    }

    #[test]
    fn test_rules_name_sources_by_category() {
        let catalog = KnowledgeBaseCatalog::builtin();
        let rules = routing_rules(&catalog).join("\n");

        assert!(rules.contains("personal data"));
        assert!(rules.contains("ALWAYS include \"GDPR\""));
        assert!(rules.contains("\"CWE\", \"CAPEC\", \"D3FEND\" together"));
        assert!(rules.contains("\"NIST SP 800-53 Rev. 5\", \"NIST CSF 2.0\", \"ISO/IEC 27002:2022\" together"));
        assert!(rules.contains("\"DORA\""));
    }

    #[test]
    fn test_response_preview() {
        assert_eq!(response_preview("I am\n  not sure"), "I am not sure");

        let long = "é".repeat(RAW_PREVIEW_CHARS + 50);
        let preview = response_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), RAW_PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_resolve_selection() {
        let catalog = KnowledgeBaseCatalog::builtin();
        let names = vec![
            "cwe".to_string(),
            "CWE".to_string(),
            "OWASP".to_string(),
            "NIST CSF 2.0".to_string(),
        ];
        assert_eq!(
            resolve_selection(&catalog, &names),
            vec!["CWE".to_string(), "NIST CSF 2.0".to_string()]
        );
    }
}
