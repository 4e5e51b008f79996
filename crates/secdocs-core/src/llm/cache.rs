//! LLM response caching to reduce API calls

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Cache entry with TTL
#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: SystemTime,
}

/// In-memory cache for LLM responses, keyed by [`cache_key`]
pub struct LLMCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl LLMCache {
    /// One hour TTL, 4096 entries
    pub fn new() -> Self {
        Self::with_limits(Duration::from_secs(3600), 4096)
    }

    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Get cached value if present and not expired
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if SystemTime::now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store a value; expired entries are dropped first when full
    pub fn set(&self, key: String, value: String) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        let now = SystemTime::now();
        if entries.len() >= self.max_entries {
            entries.retain(|_, entry| now < entry.expires_at);
        }
        if entries.len() >= self.max_entries {
            // still full of live entries: skip rather than evict at random
            return;
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }
}

impl Default for LLMCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for a request kind ("chat", "embed"), model and payload
pub fn cache_key(kind: &str, model: &str, payload: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model.as_bytes());
    hasher.update(&[0]);
    hasher.update(payload.as_bytes());
    format!("{}:{}:{}", kind, model, hasher.finalize().to_hex())
}
