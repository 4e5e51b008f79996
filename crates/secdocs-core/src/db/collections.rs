//! Collection operations

use super::Database;
use crate::error::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

/// Collection info
#[derive(Debug, Clone, serde::Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub passage_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl Database {
    /// Register a collection or bump its `updated_at`
    pub(crate) fn touch_collection(
        conn: &rusqlite::Connection,
        name: &str,
        model: &str,
        dimensions: usize,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO collections (name, embedding_model, dimensions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(name) DO UPDATE SET
                embedding_model = excluded.embedding_model,
                dimensions = excluded.dimensions,
                updated_at = excluded.updated_at",
            params![name, model, dimensions as i64, now],
        )?;
        Ok(())
    }

    /// Get a collection by name
    pub fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let conn = self.conn()?;
        let info = conn
            .query_row(
                "SELECT c.name, c.embedding_model, c.dimensions, c.created_at, c.updated_at,
                        (SELECT COUNT(*) FROM passages p WHERE p.collection = c.name)
                 FROM collections c WHERE c.name = ?1",
                params![name],
                row_to_info,
            )
            .optional()?;
        Ok(info)
    }

    /// List all collections with passage counts
    pub fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.name, c.embedding_model, c.dimensions, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM passages p WHERE p.collection = c.name)
             FROM collections c ORDER BY c.name",
        )?;

        let results = stmt
            .query_map([], row_to_info)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Remove a collection and its passages
    pub fn remove_collection(&self, name: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM passages WHERE collection = ?1", params![name])?;
        let rows = conn.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }
}

fn row_to_info(row: &rusqlite::Row<'_>) -> rusqlite::Result<CollectionInfo> {
    Ok(CollectionInfo {
        name: row.get(0)?,
        embedding_model: row.get(1)?,
        dimensions: row.get::<_, i64>(2)? as usize,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        passage_count: row.get::<_, i64>(5)? as usize,
    })
}
