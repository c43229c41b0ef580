//! A small TTL cache for upstream tokens.
//!
//! Safe under concurrent access; last-writer-wins is acceptable because
//! concurrently fetched values are equivalent upstream tokens with their own
//! expiry. Uses `tokio::time::Instant` so tests can drive the clock.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// String values with independent per-key TTLs.
pub struct TokenCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A cached value, or `None` on miss or expiry.
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Cache a value for `ttl` from now.
    pub async fn put(&self, key: &str, value: &str, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
