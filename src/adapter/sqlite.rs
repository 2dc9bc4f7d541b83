//! `SqliteAdapter` - Embedded Relational Storage
//!
//! TigerStyle: Single local file, WAL journal, explicit busy timeout.
//!
//! # Schema (per table)
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS "plugin_x" (
//!     key   TEXT PRIMARY KEY,
//!     value TEXT NOT NULL,
//!     ts    INTEGER NOT NULL
//! );
//! ```
//!
//! WAL mode lets this pool share the database file with other connections
//! the host process opens on it.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{
    check_key, check_table, decode_value, encode_value, now_ms, BackendKind, StorageAdapter,
};
use crate::constants::{SQLITE_BUSY_TIMEOUT_MS, SQLITE_POOL_CONNECTIONS_COUNT};
use crate::error::{StorageError, StorageResult};

/// Storage backend on an embedded SQLite database.
#[derive(Debug)]
pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Open (creating if missing) the database file at `path`.
    ///
    /// # Errors
    /// Returns error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub async fn open(path: impl AsRef<Path>, acquire_timeout: Duration) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::connection("sqlite", format!("{}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(SQLITE_BUSY_TIMEOUT_MS));

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_POOL_CONNECTIONS_COUNT)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::connection("sqlite", format!("failed to open: {e}")))?;

        Ok(Self { pool })
    }

    /// Get the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StorageAdapter for SqliteAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn ensure_table(&self, table: &str) -> StorageResult<()> {
        check_table(table)?;

        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                ts INTEGER NOT NULL
            )"#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(format!("failed to create {table}: {e}")))?;

        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> StorageResult<Option<Value>> {
        check_table(table)?;
        check_key(key)?;

        let raw: Option<String> =
            sqlx::query_scalar(&format!(r#"SELECT value FROM "{table}" WHERE key = ?1"#))
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::read(format!("failed to get {table}/{key}: {e}")))?;

        raw.map(|raw| decode_value(table, key, &raw)).transpose()
    }

    async fn set(&self, table: &str, key: &str, value: &Value) -> StorageResult<()> {
        check_table(table)?;
        check_key(key)?;

        sqlx::query(&format!(
            r#"INSERT INTO "{table}" (key, value, ts) VALUES (?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, ts = excluded.ts"#
        ))
        .bind(key)
        .bind(encode_value(value)?)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(format!("failed to set {table}/{key}: {e}")))?;

        Ok(())
    }

    async fn delete(&self, table: &str, key: &str) -> StorageResult<()> {
        check_table(table)?;
        check_key(key)?;

        sqlx::query(&format!(r#"DELETE FROM "{table}" WHERE key = ?1"#))
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(format!("failed to delete {table}/{key}: {e}")))?;

        Ok(())
    }

    async fn get_all(&self, table: &str) -> StorageResult<HashMap<String, Value>> {
        check_table(table)?;

        let rows = sqlx::query(&format!(r#"SELECT key, value FROM "{table}""#))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::read(format!("failed to list {table}: {e}")))?;

        let mut all = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key: String = row
                .try_get("key")
                .map_err(|e| StorageError::read(e.to_string()))?;
            let raw: String = row
                .try_get("value")
                .map_err(|e| StorageError::read(e.to_string()))?;
            let value = decode_value(table, &key, &raw)?;
            all.insert(key, value);
        }
        Ok(all)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Tests
// =============================================================================
