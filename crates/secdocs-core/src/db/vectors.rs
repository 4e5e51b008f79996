//! Vector storage operations
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.

use super::Database;
use crate::error::{Result, SecDocsError};
use crate::index::{MetadataFilter, PassageRecord, StoreHit, VectorStore};
use async_trait::async_trait;
use rusqlite::params;

const BATCH_SIZE: usize = 32;

#[async_trait]
impl VectorStore for Database {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.passage_count(collection).await? > 0)
    }

    async fn upsert(&self, collection: &str, passages: &[PassageRecord]) -> Result<usize> {
        if passages.is_empty() {
            return Ok(0);
        }

        let mut embeddings = Vec::with_capacity(passages.len());
        for batch in passages.chunks(BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|p| p.content.clone()).collect();
            let batch_embeddings = self.embedder.embed_batch(&texts).await?;
            if batch_embeddings.len() != batch.len() {
                return Err(SecDocsError::Index(format!(
                    "Embedder returned {} vectors for {} passages",
                    batch_embeddings.len(),
                    batch.len()
                )));
            }
            embeddings.extend(batch_embeddings);
            tracing::debug!(
                "Embedded {}/{} passages for '{}'",
                embeddings.len(),
                passages.len(),
                collection
            );
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Database::touch_collection(
            &tx,
            collection,
            self.embedder.model_name(),
            self.embedder.dimensions(),
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO passages (collection, id, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (passage, embedding) in passages.iter().zip(&embeddings) {
                let metadata = serde_json::to_string(&passage.metadata)?;
                stmt.execute(params![
                    collection,
                    passage.id,
                    passage.content,
                    metadata,
                    embedding_to_bytes(embedding)
                ])?;
            }
        }
        tx.commit()?;

        Ok(passages.len())
    }

    async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<StoreHit>> {
        if top_k == 0 {
            return Ok(vec![]);
        }

        self.check_model_compatibility(collection)?;
        let query_embedding = self.embedder.embed(text).await?;

        let conn = self.conn()?;
        let rows: Vec<(String, String, String, Vec<u8>)> = match filter {
            Some(filter) => {
                let mut stmt = conn.prepare(
                    "SELECT id, content, metadata, embedding FROM passages
                     WHERE collection = ?1 AND json_extract(metadata, ?2) = ?3",
                )?;
                let rows = stmt
                    .query_map(
                        params![collection, json_path(&filter.field), filter.value],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, content, metadata, embedding FROM passages WHERE collection = ?1",
                )?;
                let rows = stmt
                    .query_map(params![collection], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        drop(conn);

        let mut hits = rows
            .into_iter()
            .map(|(id, content, metadata, embedding)| {
                let score = cosine_similarity(&query_embedding, &bytes_to_embedding(&embedding));
                Ok(StoreHit {
                    record: PassageRecord {
                        id,
                        content,
                        metadata: serde_json::from_str(&metadata)?,
                    },
                    score: score as f64,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn passage_count(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM passages WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl Database {
    /// Warn when a collection was embedded with a different model
    fn check_model_compatibility(&self, collection: &str) -> Result<()> {
        if let Some(info) = self.get_collection(collection)? {
            if info.embedding_model != self.embedder.model_name() {
                tracing::warn!(
                    "Collection '{}' was embedded with '{}' but queries use '{}'; rebuild it for meaningful scores",
                    collection,
                    info.embedding_model,
                    self.embedder.model_name()
                );
            }
        }
        Ok(())
    }
}

/// JSON path for a top-level metadata key, quoted so dots and dashes are literal
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Embedder;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Bag-of-words over a tiny vocabulary
    struct VocabEmbedder {
        batches: AtomicUsize,
    }

    const VOCAB: &[&str] = &["xss", "script", "sql", "injection", "personal", "data", "access", "control"];

    fn vocab_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCAB
            .iter()
            .map(|w| lower.matches(w).count() as f32)
            .collect()
    }

    #[async_trait]
    impl Embedder for VocabEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vocab_vector(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vocab_vector(t)).collect())
        }

        fn dimensions(&self) -> usize {
            VOCAB.len()
        }

        fn model_name(&self) -> &str {
            "vocab"
        }
    }

    fn record(id: &str, content: &str, metadata: serde_json::Value) -> PassageRecord {
        PassageRecord {
            id: id.to_string(),
            content: content.to_string(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    fn test_db() -> (Database, Arc<VocabEmbedder>) {
        let embedder = Arc::new(VocabEmbedder {
            batches: AtomicUsize::new(0),
        });
        let db = Database::open_in_memory(embedder.clone()).unwrap();
        db.initialize().unwrap();
        (db, embedder)
    }

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![1.0f32, 2.0, 3.0, -1.5];
        let bytes = embedding_to_bytes(&original);
        let restored = bytes_to_embedding(&bytes);
        assert_eq!(original, restored);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 0.0001);
    }

    #[test]
    fn test_json_path_quotes_field() {
        assert_eq!(json_path("cwe_id"), "$.\"cwe_id\"");
        assert_eq!(json_path("a.b"), "$.\"a.b\"");
    }

    #[tokio::test]
    async fn test_empty_collection_does_not_exist() {
        let (db, _) = test_db();
        assert!(!db.collection_exists("cwe").await.unwrap());
        assert_eq!(db.upsert("cwe", &[]).await.unwrap(), 0);
        assert!(!db.collection_exists("cwe").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_and_semantic_query() {
        let (db, _) = test_db();
        db.upsert(
            "cwe",
            &[
                record("79", "XSS: script injection in web pages", json!({"cwe_id": "CWE-79"})),
                record("89", "SQL injection", json!({"cwe_id": "CWE-89"})),
            ],
        )
        .await
        .unwrap();

        assert!(db.collection_exists("cwe").await.unwrap());
        assert_eq!(db.passage_count("cwe").await.unwrap(), 2);

        let hits = db.query("cwe", "sql", 10, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "89");
        assert!(hits[0].score > hits[1].score);

        let top1 = db.query("cwe", "xss script", 1, None).await.unwrap();
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].record.id, "79");
    }

    #[tokio::test]
    async fn test_metadata_filter_is_exact() {
        let (db, _) = test_db();
        db.upsert(
            "cwe",
            &[
                record("79", "XSS", json!({"cwe_id": "CWE-79"})),
                record("790", "Improper filtering", json!({"cwe_id": "CWE-790"})),
                record("89", "SQL injection", json!({"cwe_id": "CWE-89"})),
            ],
        )
        .await
        .unwrap();

        let filter = MetadataFilter::eq("cwe_id", "CWE-79");
        let hits = db.query("cwe", "CWE-79", 20, Some(&filter)).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.metadata["cwe_id"], "CWE-79");
    }

    #[tokio::test]
    async fn test_collections_are_isolated_and_upsert_replaces() {
        let (db, _) = test_db();
        db.upsert("gdpr", &[record("a", "personal data", json!({}))])
            .await
            .unwrap();
        db.upsert("gdpr", &[record("a", "personal data v2", json!({}))])
            .await
            .unwrap();
        db.upsert("nist", &[record("a", "access control", json!({}))])
            .await
            .unwrap();

        let hits = db.query("gdpr", "data", 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.content, "personal data v2");

        let info = db.get_collection("gdpr").unwrap().unwrap();
        assert_eq!(info.passage_count, 1);
        assert_eq!(info.embedding_model, "vocab");
        assert_eq!(db.list_collections().unwrap().len(), 2);

        assert!(db.remove_collection("gdpr").unwrap());
        assert!(!db.collection_exists("gdpr").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_embeds_in_batches() {
        let (db, embedder) = test_db();
        let passages: Vec<_> = (0..70)
            .map(|i| record(&i.to_string(), "access control", json!({})))
            .collect();

        assert_eq!(db.upsert("nist", &passages).await.unwrap(), 70);
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 3);
    }
}
