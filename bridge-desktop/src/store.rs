//! Durable key-value storage over SQLite.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;

use bridge_traits::{BridgeError, KeyValueStore};

type Result<T> = std::result::Result<T, BridgeError>;

/// SQLite-backed [`KeyValueStore`].
///
/// A single `kv_entries` table with upsert writes; every operation is one
/// statement, so single-key writes are atomic as the trait requires.
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Opens (creating if missing) a store at the given file path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        let store = Self { pool };
        store.migrate().await?;
        info!(path = %path.as_ref().display(), "Key-value store opened");
        Ok(store)
    }

    /// Opens an in-memory store, mainly for integration tests.
    pub async fn in_memory() -> Result<Self> {
        // One connection only: each SQLite :memory: connection is its own
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await
            .map_err(storage_error)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key   TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}

fn storage_error(e: sqlx::Error) -> BridgeError {
    BridgeError::Storage(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(|r| Bytes::from(r.get::<Vec<u8>, _>("value"))))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value.as_ref())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        // Queue and cache namespaces contain no LIKE metacharacters
        let rows = sqlx::query("SELECT key FROM kv_entries WHERE key LIKE ? || '%'")
            .bind(prefix)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(rows.iter().map(|r| r.get::<String, _>("key")).collect())
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries")
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}
