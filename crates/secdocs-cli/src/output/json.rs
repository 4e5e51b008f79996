//! JSON output formatter

use anyhow::Result;
use secdocs_core::{IndexHandle, IndexState, KnowledgeBaseCatalog, QueryResult};
use serde::Serialize;
use std::sync::Arc;

pub fn to_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

pub fn format_answer(result: &QueryResult, show_context: bool) -> Result<String> {
    let mut value = serde_json::to_value(result)?;
    if !show_context {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("context");
            obj.remove("passages");
        }
    }
    to_pretty(&value)
}

pub fn format_sources(catalog: &KnowledgeBaseCatalog) -> Result<String> {
    let sources: Vec<_> = catalog.iter().collect();
    to_pretty(&sources)
}

pub fn format_build(handles: &[Arc<IndexHandle>]) -> Result<String> {
    let output: Vec<serde_json::Value> = handles
        .iter()
        .map(|h| match h.state() {
            IndexState::Ready { passages } => serde_json::json!({
                "source": h.source(),
                "collection": h.collection(),
                "usable": true,
                "passages": passages,
            }),
            IndexState::Unusable { reason } => serde_json::json!({
                "source": h.source(),
                "collection": h.collection(),
                "usable": false,
                "reason": reason,
            }),
        })
        .collect();

    to_pretty(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_sources_render_as_array() {
        let catalog = KnowledgeBaseCatalog::builtin();
        let output = format_sources(&catalog).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value.as_array().unwrap().len(), catalog.len());
    }

    #[test]
    fn test_serialization_error_is_returned() {
        // JSON object keys must be strings
        let mut map = HashMap::new();
        map.insert(vec![1u8, 2], "x");
        assert!(to_pretty(&map).is_err());
    }
}
