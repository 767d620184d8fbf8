//! The cache layer.

use bytes::Bytes;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use bridge_traits::{Clock, KeyValueStore};

use crate::error::{CacheError, Result};
use crate::key::QueryKey;

const KEY_PREFIX: &str = "cache:";

/// Tunables for the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Default time-to-live for entries without a per-put override
    pub default_ttl: Duration,
    /// Maximum entries kept in the in-memory front
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            capacity: 64,
        }
    }
}

/// A fetched collection, as cached and surfaced to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    /// Opaque collection items in server order
    pub items: Vec<serde_json::Value>,
}

impl CollectionSnapshot {
    pub fn new(items: Vec<serde_json::Value>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> u64 {
        self.items.len() as u64
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    pub value: CollectionSnapshot,
    /// Whether the entry is within its TTL
    pub fresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    key: QueryKey,
    value: CollectionSnapshot,
    fetched_at_ms: i64,
    ttl_ms: i64,
}

impl StoredEntry {
    fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.fetched_at_ms < self.ttl_ms
    }
}

/// TTL cache with a bounded in-memory front and a durable write-through back.
///
/// Writes are last-write-wins. A stale entry is never silently dropped: it is
/// surfaced with `fresh = false` so callers can decide whether to show it
/// while revalidating.
pub struct CacheLayer {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    memory: Mutex<LruCache<String, StoredEntry>>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            clock,
            config,
            memory: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn ledger_key(signature: &str) -> String {
        format!("{}{}", KEY_PREFIX, signature)
    }

    /// Looks up a collection, returning a miss only when no entry exists
    /// anywhere (memory or ledger).
    pub async fn get(&self, key: &QueryKey) -> Result<Option<CacheHit>> {
        let signature = key.signature();
        let now_ms = self.clock.unix_timestamp_millis();

        if let Some(entry) = self.memory.lock().unwrap().get(&signature).cloned() {
            return Ok(Some(CacheHit {
                fresh: entry.is_fresh(now_ms),
                value: entry.value,
            }));
        }

        // Read-through: an LRU-evicted or pre-restart entry lives on in the
        // ledger.
        let Some(bytes) = self
            .store
            .get(&Self::ledger_key(&signature))
            .await
            .map_err(|e| CacheError::Storage(format!("Failed to read {}: {}", signature, e)))?
        else {
            return Ok(None);
        };

        let entry: StoredEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %signature, error = %e, "Dropping corrupt cache entry");
                self.store
                    .delete(&Self::ledger_key(&signature))
                    .await
                    .map_err(|e| {
                        CacheError::Storage(format!("Failed to drop {}: {}", signature, e))
                    })?;
                return Ok(None);
            }
        };

        let hit = CacheHit {
            fresh: entry.is_fresh(now_ms),
            value: entry.value.clone(),
        };
        self.memory.lock().unwrap().put(signature, entry);
        Ok(Some(hit))
    }

    /// Stores a collection, replacing any previous entry (last-write-wins).
    pub async fn put(
        &self,
        key: &QueryKey,
        value: CollectionSnapshot,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let signature = key.signature();
        let entry = StoredEntry {
            key: key.clone(),
            value,
            fetched_at_ms: self.clock.unix_timestamp_millis(),
            ttl_ms: ttl.unwrap_or(self.config.default_ttl).as_millis() as i64,
        };

        let bytes = serde_json::to_vec(&entry)
            .map_err(|e| CacheError::Codec(format!("Failed to serialize {}: {}", signature, e)))?;

        self.store
            .set(&Self::ledger_key(&signature), Bytes::from(bytes))
            .await
            .map_err(|e| CacheError::Storage(format!("Failed to write {}: {}", signature, e)))?;

        self.memory.lock().unwrap().put(signature, entry);
        Ok(())
    }

    /// Removes every entry whose key matches the predicate.
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&QueryKey) -> bool,
    {
        let ledger_keys = self
            .store
            .keys_with_prefix(KEY_PREFIX)
            .await
            .map_err(|e| CacheError::Storage(format!("Failed to list cache keys: {}", e)))?;

        let mut removed = 0usize;
        for ledger_key in ledger_keys {
            let Some(bytes) = self
                .store
                .get(&ledger_key)
                .await
                .map_err(|e| CacheError::Storage(format!("Failed to read {}: {}", ledger_key, e)))?
            else {
                continue;
            };

            let matches = match serde_json::from_slice::<StoredEntry>(&bytes) {
                Ok(entry) => predicate(&entry.key),
                // A corrupt entry cannot be matched; drop it too
                Err(_) => true,
            };

            if matches {
                self.store.delete(&ledger_key).await.map_err(|e| {
                    CacheError::Storage(format!("Failed to remove {}: {}", ledger_key, e))
                })?;
                let signature = ledger_key.trim_start_matches(KEY_PREFIX).to_string();
                self.memory.lock().unwrap().pop(&signature);
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "Cache entries invalidated");
        }
        Ok(removed)
    }

    /// Removes every cache entry.
    pub async fn clear(&self) -> Result<()> {
        self.invalidate(|_| true).await.map(|_| ())
    }
}
