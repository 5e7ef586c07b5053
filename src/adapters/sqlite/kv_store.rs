//! SQLite implementation of the KeyValueStore port.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::domain::errors::DomainResult;
use crate::domain::ports::{KeyValueStore, UpdateFn};

/// Key-value store over the `kv_entries` table.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Store over a migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn read_modify_write(conn: &mut SqliteConnection, key: &str, f: UpdateFn) -> DomainResult<()> {
        let current: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?;

        match f(current.map(|(v,)| v))? {
            Some(value) => {
                sqlx::query(
                    "INSERT INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                )
                .bind(key)
                .bind(value)
                .bind(Utc::now().to_rfc3339())
                .execute(&mut *conn)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM kv_entries WHERE key = ?")
                    .bind(key)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> DomainResult<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> DomainResult<Vec<String>> {
        // substr avoids LIKE wildcard escaping for prefixes containing % or _.
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT key FROM kv_entries WHERE substr(key, 1, length(?)) = ? ORDER BY key")
                .bind(prefix)
                .bind(prefix)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    async fn update(&self, key: &str, f: UpdateFn) -> DomainResult<()> {
        // Dropping the transaction before commit rolls it back, so a
        // cancelled update never returns a connection mid-transaction.
        let mut tx = self.pool.begin().await?;

        // A write before the read takes the database write lock, so no other
        // writer can slip in between the read and the write.
        sqlx::query("UPDATE kv_entries SET key = key WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        match Self::read_modify_write(&mut *tx, key, f).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(key, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}
