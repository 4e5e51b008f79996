//! Structured identifier recognition (CWE-79, AC-2(1), GV.OC-01, ...)

use crate::catalog::KnowledgeBaseCatalog;
use crate::error::Result;
use regex::Regex;

/// Finds `<PREFIX>-<suffix>` identifiers whose prefix is in a known taxonomy.
///
/// Matching is case-insensitive and tolerates spaces around the hyphen
/// ("cwe - 79"); output is uppercase with the spaces removed. A bare space is
/// not a separator, so "at 5" is never read as the control `AT-5`.
#[derive(Debug, Clone)]
pub struct EntityIdDetector {
    pattern: Option<Regex>,
}

impl EntityIdDetector {
    pub fn new<I, S>(prefixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(|p| p.as_ref().trim().to_ascii_uppercase())
            .filter(|p| !p.is_empty())
            .collect();

        if prefixes.is_empty() {
            return Ok(Self { pattern: None });
        }

        // longest first so CAPEC wins over CA
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();

        let alternation = prefixes
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(
            r"(?i)\b(?P<prefix>{})(?P<category>\.[a-z]{{2}})?\s*-\s*(?P<suffix>\d[a-z0-9]*(?:\.\d+)*(?:\(\d+\))?)",
            alternation
        ))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Detector over every prefix in the catalog's taxonomy
    pub fn from_catalog(catalog: &KnowledgeBaseCatalog) -> Result<Self> {
        Self::new(catalog.identifier_prefix_map().keys())
    }

    /// Normalized identifiers in order of first appearance, without repeats
    pub fn detect(&self, query: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return vec![];
        };

        let mut found: Vec<String> = Vec::new();
        for caps in pattern.captures_iter(query) {
            let id = format!(
                "{}{}-{}",
                &caps["prefix"],
                caps.name("category").map_or("", |m| m.as_str()),
                &caps["suffix"]
            )
            .to_ascii_uppercase();

            if !found.contains(&id) {
                found.push(id);
            }
        }
        found
    }

    /// Taxonomy prefix of a normalized identifier ("GV.OC-01" -> "GV")
    pub fn prefix_of(id: &str) -> &str {
        let head = id.split('-').next().unwrap_or(id);
        head.split('.').next().unwrap_or(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detector() -> EntityIdDetector {
        EntityIdDetector::from_catalog(&KnowledgeBaseCatalog::builtin()).unwrap()
    }

    #[test]
    fn test_detects_weakness_and_attack_ids() {
        let d = detector();
        assert_eq!(d.detect("What is CWE-79?"), vec!["CWE-79"]);
        assert_eq!(
            d.detect("Compare capec-63 with CWE-79 and CWE-79."),
            vec!["CAPEC-63", "CWE-79"]
        );
    }

    #[test]
    fn test_normalizes_case_and_spacing() {
        let d = detector();
        assert_eq!(d.detect("explain cwe - 89 please"), vec!["CWE-89"]);
        assert_eq!(d.detect("ac-2(1) enhancements"), vec!["AC-2(1)"]);
    }

    #[test]
    fn test_detects_csf_subcategories() {
        let d = detector();
        assert_eq!(
            d.detect("How do GV.OC-01 and pr.aa-05 relate?"),
            vec!["GV.OC-01", "PR.AA-05"]
        );
    }

    #[test]
    fn test_ignores_non_identifiers() {
        let d = detector();
        assert!(d.detect("How does GDPR define personal data?").is_empty());
        assert!(d.detect("look at 5 controls").is_empty());
        assert!(d.detect("NIST SP 800-53 access control").is_empty());
        assert!(d.detect("de-facto standard").is_empty());
        assert!(d.detect("XCWE-79").is_empty());
    }

    #[test]
    fn test_unknown_prefixes_not_detected() {
        let d = EntityIdDetector::new(["CWE"]).unwrap();
        assert!(d.detect("AC-2 and CAPEC-63").is_empty());
        assert_eq!(d.detect("CWE-1021"), vec!["CWE-1021"]);
    }

    #[test]
    fn test_empty_taxonomy_detects_nothing() {
        let d = EntityIdDetector::new(Vec::<String>::new()).unwrap();
        assert!(d.detect("CWE-79").is_empty());
    }

    #[test]
    fn test_prefix_of() {
        assert_eq!(EntityIdDetector::prefix_of("CWE-79"), "CWE");
        assert_eq!(EntityIdDetector::prefix_of("GV.OC-01"), "GV");
        assert_eq!(EntityIdDetector::prefix_of("AC-2(1)"), "AC");
    }

    proptest! {
        #[test]
        fn prop_detection_is_deterministic_and_normalized(query in "[ a-zA-Z0-9.()-]{0,60}") {
            let d = detector();
            let first = d.detect(&query);
            prop_assert_eq!(&first, &d.detect(&query));

            let prefixes = KnowledgeBaseCatalog::builtin().identifier_prefix_map();
            for id in &first {
                prop_assert_eq!(id, &id.to_ascii_uppercase());
                prop_assert!(!id.contains(' '));
                prop_assert!(prefixes.contains_key(EntityIdDetector::prefix_of(id)));
            }
        }

        #[test]
        fn prop_embedded_cwe_ids_are_found(n in 1u32..5000, prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
            let query = format!("{} CWE-{} {}", prefix, n, suffix);
            let expected = format!("CWE-{}", n);
            prop_assert!(detector().detect(&query).contains(&expected));
        }
    }
}
