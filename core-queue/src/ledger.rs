//! Durable persistence of queue items.
//!
//! Items are stored one per key under the `queue:{id}` namespace of the host
//! [`KeyValueStore`], serialized as JSON. Single-key writes are atomic by the
//! store contract, so a crash leaves each item either fully old or fully new.

use bytes::Bytes;
use std::sync::Arc;
use tracing::warn;

use bridge_traits::KeyValueStore;

use crate::error::{QueueError, Result};
use crate::item::{SubmissionId, SubmissionItem};

const KEY_PREFIX: &str = "queue:";

/// Repository for [`SubmissionItem`]s over a [`KeyValueStore`].
#[derive(Clone)]
pub struct SubmissionLedger {
    store: Arc<dyn KeyValueStore>,
}

impl SubmissionLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(id: &SubmissionId) -> String {
        format!("{}{}", KEY_PREFIX, id)
    }

    /// Persists one item, replacing any previous version.
    pub async fn save(&self, item: &SubmissionItem) -> Result<()> {
        let bytes = serde_json::to_vec(item)
            .map_err(|e| QueueError::Ledger(format!("Failed to serialize {}: {}", item.id, e)))?;

        self.store
            .set(&Self::key(&item.id), Bytes::from(bytes))
            .await
            .map_err(|e| QueueError::Ledger(format!("Failed to persist {}: {}", item.id, e)))
    }

    /// Loads one item, if present.
    pub async fn load(&self, id: &SubmissionId) -> Result<Option<SubmissionItem>> {
        let Some(bytes) = self
            .store
            .get(&Self::key(id))
            .await
            .map_err(|e| QueueError::Ledger(format!("Failed to read {}: {}", id, e)))?
        else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| QueueError::Ledger(format!("Corrupt ledger entry for {}: {}", id, e)))
    }

    /// Removes one item. Removing an absent item is not an error.
    pub async fn remove(&self, id: &SubmissionId) -> Result<()> {
        self.store
            .delete(&Self::key(id))
            .await
            .map_err(|e| QueueError::Ledger(format!("Failed to remove {}: {}", id, e)))
    }

    /// Loads every item in the queue namespace.
    ///
    /// Entries that fail to deserialize are skipped with a warning rather
    /// than poisoning the whole reload.
    pub async fn load_all(&self) -> Result<Vec<SubmissionItem>> {
        let keys = self
            .store
            .keys_with_prefix(KEY_PREFIX)
            .await
            .map_err(|e| QueueError::Ledger(format!("Failed to list queue keys: {}", e)))?;

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(bytes) = self
                .store
                .get(&key)
                .await
                .map_err(|e| QueueError::Ledger(format!("Failed to read {}: {}", key, e)))?
            else {
                continue;
            };

            match serde_json::from_slice::<SubmissionItem>(&bytes) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping corrupt ledger entry");
                }
            }
        }

        Ok(items)
    }
}
