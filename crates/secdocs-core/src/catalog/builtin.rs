//! Built-in cybersecurity knowledge bases

use super::{ChunkingPolicy, KnowledgeBase, SourceCategory};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// NIST SP 800-53 control families
const NIST_800_53_FAMILIES: &[&str] = &[
    "AC", "AT", "AU", "CA", "CM", "CP", "IA", "IR", "MA", "MP", "PE", "PL", "PM", "PS", "PT",
    "RA", "SA", "SC", "SI", "SR",
];

/// NIST CSF 2.0 functions
const NIST_CSF_FUNCTIONS: &[&str] = &["GV", "ID", "PR", "DE", "RS", "RC"];

fn taxonomy(prefixes: &[&str], field: &str) -> BTreeMap<String, String> {
    prefixes
        .iter()
        .map(|p| (p.to_string(), field.to_string()))
        .collect()
}

struct Entry {
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    category: SourceCategory,
    collection: &'static str,
    file: &'static str,
    chunking: ChunkingPolicy,
    identifier_prefixes: BTreeMap<String, String>,
    sample_questions: &'static [&'static str],
}

impl From<Entry> for KnowledgeBase {
    fn from(e: Entry) -> Self {
        KnowledgeBase {
            name: e.name.to_string(),
            display_name: Some(e.display_name.to_string()),
            description: e.description.to_string(),
            category: e.category,
            collection: e.collection.to_string(),
            parser: "jsonl".to_string(),
            file: PathBuf::from(e.file),
            chunking: e.chunking,
            identifier_prefixes: e.identifier_prefixes,
            sample_questions: e.sample_questions.iter().map(|q| q.to_string()).collect(),
        }
    }
}

/// The nine reference collections shipped by default
pub fn builtin_knowledge_bases() -> Vec<KnowledgeBase> {
    let entries = vec![
        Entry {
            name: "GDPR",
            display_name: "GDPR (General Data Protection Regulation)",
            description: "A European Union regulation on data protection and privacy for all individuals within the EU.",
            category: SourceCategory::Regulations,
            collection: "gdpr_v1_modular",
            file: "GDPR.jsonl",
            chunking: ChunkingPolicy::windowed(),
            identifier_prefixes: BTreeMap::new(),
            sample_questions: &[
                "What is the definition of 'personal data' specified in GDPR?",
                "Under what conditions can a person request their data to be erased, according to Article 17?",
            ],
        },
        Entry {
            name: "DORA",
            display_name: "DORA (Digital Operational Resilience Act)",
            description: "A European Union regulation for the financial sector focusing on digital operational resilience.",
            category: SourceCategory::Regulations,
            collection: "dora_v1_modular",
            file: "DORA.jsonl",
            chunking: ChunkingPolicy::windowed(),
            identifier_prefixes: BTreeMap::new(),
            sample_questions: &[
                "What is the definition of 'digital operational resilience' according to DORA?",
                "What is the role of the management body regarding the ICT risk management framework, as specified in Article 5 of DORA?",
            ],
        },
        Entry {
            name: "NIS2 Directive",
            display_name: "NIS2 Directive",
            description: "A European Union directive on cybersecurity for critical infrastructure sectors.",
            category: SourceCategory::Regulations,
            collection: "nis2_v1_modular",
            file: "NIS2.jsonl",
            chunking: ChunkingPolicy::windowed(),
            identifier_prefixes: BTreeMap::new(),
            sample_questions: &[
                "What are the minimum cybersecurity risk-management measures that essential and important entities must take under Article 21 of the NIS2 Directive?",
            ],
        },
        Entry {
            name: "NIST SP 800-53 Rev. 5",
            display_name: "NIST SP 800-53 Rev. 5",
            description: "A comprehensive catalog of security and privacy controls for U.S. federal information systems.",
            category: SourceCategory::Frameworks,
            collection: "nist80053r5_v1_modular",
            file: "NIST.SP.800-53r5.jsonl",
            chunking: ChunkingPolicy::granular(),
            identifier_prefixes: taxonomy(NIST_800_53_FAMILIES, "control_id"),
            sample_questions: &[
                "What is the purpose of the AC-1 (Policy and Procedures) control in the Access Control family?",
                "What is the purpose of the 'Dynamic Privilege Management' enhancement for control AC-2 (Account Management)?",
                "What does the PT-4 (Consent) control require an organization to do regarding Personally Identifiable Information (PII)?",
            ],
        },
        Entry {
            name: "NIST CSF 2.0",
            display_name: "NIST Cybersecurity Framework 2.0",
            description: "A high-level framework for managing cybersecurity risk, organized by Govern, Identify, Protect, Detect, Respond, and Recover.",
            category: SourceCategory::Frameworks,
            collection: "nist_csf2_v1_modular",
            file: "NISTCSWP29.jsonl",
            chunking: ChunkingPolicy::windowed(),
            identifier_prefixes: taxonomy(NIST_CSF_FUNCTIONS, "subcategory_id"),
            sample_questions: &[
                "What are the main goals of the GOVERN function in the NIST CSF 2.0?",
                "List the categories within the PROTECT function of the NIST CSF 2.0.",
            ],
        },
        Entry {
            name: "ISO/IEC 27002:2022",
            display_name: "ISO/IEC 27002:2022",
            description: "An international standard providing a catalog of information security controls to support an ISO 27001 ISMS.",
            category: SourceCategory::Frameworks,
            collection: "iso_27002_v1_modular",
            file: "ISO_27002.jsonl",
            chunking: ChunkingPolicy::windowed(),
            identifier_prefixes: BTreeMap::new(),
            sample_questions: &[
                "What is the purpose of control 5.7 Threat intelligence in ISO 27002?",
                "What is the purpose of control 8.12 Data leakage prevention in ISO 27002?",
            ],
        },
        Entry {
            name: "CWE",
            display_name: "CWE (Common Weakness Enumeration)",
            description: "A list of common software and hardware weakness types (e.g., CWE-79 for Cross-Site Scripting).",
            category: SourceCategory::ThreatIntelligence,
            collection: "cwe_xml_modular",
            file: "cwec_latest.jsonl",
            chunking: ChunkingPolicy::granular(),
            identifier_prefixes: taxonomy(&["CWE"], "cwe_id"),
            sample_questions: &[
                "What is CWE-89: Improper Neutralization of Special Elements used in an SQL Command ('SQL Injection')?",
                "What are the related CAPEC attack patterns for CWE-79: Cross-Site Scripting (XSS)?",
            ],
        },
        Entry {
            name: "CAPEC",
            display_name: "CAPEC (Common Attack Pattern Enumeration and Classification)",
            description: "A dictionary of known patterns of attack used by adversaries.",
            category: SourceCategory::ThreatIntelligence,
            collection: "capec_xml_modular",
            file: "capec_latest.jsonl",
            chunking: ChunkingPolicy::granular(),
            identifier_prefixes: taxonomy(&["CAPEC"], "capec_id"),
            sample_questions: &[
                "What is CAPEC-66: SQL Injection, and what are its typical consequences?",
                "According to the CAPEC data, what are the main CWE weaknesses related to CAPEC-115: Authentication Bypass?",
            ],
        },
        Entry {
            name: "D3FEND",
            display_name: "D3FEND",
            description: "A knowledge graph of defensive cybersecurity techniques and countermeasures.",
            category: SourceCategory::ThreatIntelligence,
            collection: "d3fend_ontology_modular",
            file: "d3fend.jsonl",
            chunking: ChunkingPolicy::windowed(),
            identifier_prefixes: BTreeMap::new(),
            sample_questions: &[
                "What is 'File Encryption' (D3-FE) according to D3FEND?",
                "Which MITRE ATT&CK technique does the D3FEND technique 'Decoy Credentials' primarily counter?",
            ],
        },
    ];

    entries.into_iter().map(KnowledgeBase::from).collect()
}
