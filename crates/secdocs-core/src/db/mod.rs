//! Database layer for secdocs
//!
//! SQLite-backed vector store: one collection per knowledge base, embeddings
//! stored as BLOBs next to each passage's content and JSON metadata.

mod collections;
mod schema;
pub mod vectors;

pub use collections::CollectionInfo;
pub use schema::Database;
use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("index.sqlite")
    }
}
