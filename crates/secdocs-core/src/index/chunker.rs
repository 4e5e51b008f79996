//! Document chunking for embedding

use super::parser::ParsedRecord;
use super::store::PassageRecord;
use crate::catalog::ChunkingPolicy;

/// Document chunk
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    /// Byte offset in the source text
    pub position: usize,
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Character-based chunking, preferring paragraph and sentence breaks
pub fn chunk_by_chars(content: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if content.len() <= chunk_size {
        return vec![Chunk {
            text: content.to_string(),
            position: 0,
        }];
    }

    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < content.len() {
        let raw_end = (start + chunk_size).min(content.len());
        let mut end = floor_char_boundary(content, raw_end);
        if end <= start {
            // chunk_size smaller than one char
            end = ceil_char_boundary(content, start + 1);
        }
        let mut chunk_end = end;

        // Find natural break point in last 30%
        if end < content.len() {
            let search_start_raw = start + (chunk_size * 70 / 100);
            let search_start = ceil_char_boundary(content, search_start_raw);

            if search_start < end {
                let search_region = &content[search_start..end];

                if let Some(pos) = search_region.rfind("\n\n") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind(". ") {
                    chunk_end = search_start + pos + 2;
                } else if let Some(pos) = search_region.rfind('\n') {
                    chunk_end = search_start + pos + 1;
                } else if let Some(pos) = search_region.rfind(' ') {
                    chunk_end = search_start + pos + 1;
                }
            }
        }

        chunk_end = floor_char_boundary(content, chunk_end);

        chunks.push(Chunk {
            text: content[start..chunk_end].to_string(),
            position: start,
        });

        if chunk_end >= content.len() {
            break;
        }

        let next_start = ceil_char_boundary(content, chunk_end.saturating_sub(overlap));
        // always advance, even when overlap swallows the whole chunk
        start = if next_start > start { next_start } else { chunk_end };
    }

    chunks
}

/// Split parsed records into passages according to the source's policy.
///
/// Each chunk inherits its record's metadata. Passage ids are derived from
/// the collection, record ordinal and chunk offset, so rebuilding the same
/// input yields the same ids.
pub fn apply_chunking(
    collection: &str,
    policy: &ChunkingPolicy,
    records: &[ParsedRecord],
) -> Vec<PassageRecord> {
    let (chunk_size, overlap) = match *policy {
        ChunkingPolicy::Granular { chunk_size } => (chunk_size, 0),
        ChunkingPolicy::Windowed {
            chunk_size,
            overlap,
        } => (chunk_size, overlap),
    };

    records
        .iter()
        .enumerate()
        .flat_map(|(ordinal, record)| {
            chunk_by_chars(&record.text, chunk_size, overlap)
                .into_iter()
                .filter(|chunk| !chunk.text.trim().is_empty())
                .map(move |chunk| PassageRecord {
                    id: passage_id(collection, ordinal, chunk.position),
                    content: chunk.text.trim().to_string(),
                    metadata: record.metadata.clone(),
                })
        })
        .collect()
}

fn passage_id(collection: &str, ordinal: usize, position: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(collection.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(ordinal as u64).to_le_bytes());
    hasher.update(&(position as u64).to_le_bytes());
    hasher.finalize().to_hex()[..16].to_string()
}
