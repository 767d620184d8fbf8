//! Durable Key-Value Storage Abstraction
//!
//! Backs the submission ledger (`queue:{id}`) and the collection cache
//! (`cache:{sig}`). Implementations must provide atomic single-key writes and
//! survive process restart:
//! - iOS/Android: SQLite or platform key-value storage
//! - Desktop: SQLite (see `bridge-desktop`)

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;

/// Durable key-value storage capability
///
/// # Example
///
/// ```ignore
/// use bridge_traits::store::KeyValueStore;
///
/// async fn persist(store: &dyn KeyValueStore, id: &str, record: &[u8]) -> Result<()> {
///     store.set(&format!("queue:{}", id), record.to_vec().into()).await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Write `value` under `key`, replacing any previous value atomically
    async fn set(&self, key: &str, value: Bytes) -> Result<()>;

    /// Delete the value under `key`; deleting an absent key is a no-op
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all keys starting with `prefix`, in unspecified order
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove every entry
    async fn clear_all(&self) -> Result<()> {
        for key in self.keys_with_prefix("").await? {
            self.delete(&key).await?;
        }
        Ok(())
    }
}

/// In-memory store for tests and development.
///
/// Data does not survive the process; "restart" scenarios in tests share one
/// instance across two engine lifetimes instead.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}
