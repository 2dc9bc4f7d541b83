//! `MysqlAdapter` - Relational Storage on MySQL / MariaDB
//!
//! Same `(key, value, ts)` layout as the Postgres adapter. `key` and
//! `value` are reserved words in MySQL, so every identifier is backtick
//! quoted. Keys are `VARBINARY(255)`: MySQL cannot index unbounded `TEXT`
//! as a primary key, and the default collations compare case-insensitively.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row;

use super::{
    check_key, check_table, decode_value, encode_value, now_ms, BackendKind, StorageAdapter,
};
use crate::error::{StorageError, StorageResult};

/// MySQL storage backend.
#[derive(Debug)]
pub struct MysqlAdapter {
    pool: MySqlPool,
}

impl MysqlAdapter {
    /// Connect with a `mysql://` or `mariadb://` URL.
    ///
    /// # Errors
    /// Returns error if the URL has another scheme or the connection fails.
    pub async fn connect(
        connection_string: &str,
        connections_max: u32,
        acquire_timeout: Duration,
    ) -> StorageResult<Self> {
        assert!(connections_max > 0, "pool must allow at least one connection");
        if !(connection_string.starts_with("mysql://")
            || connection_string.starts_with("mariadb://"))
        {
            return Err(StorageError::connection(
                "mysql",
                "connection string must be a mysql:// URL",
            ));
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(connections_max)
            .acquire_timeout(acquire_timeout)
            .connect(connection_string)
            .await
            .map_err(|e| StorageError::connection("mysql", format!("failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Get the connection pool.
    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl StorageAdapter for MysqlAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Mysql
    }

    async fn ensure_table(&self, table: &str) -> StorageResult<()> {
        check_table(table)?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS `{table}` (
                `key` VARBINARY(255) NOT NULL PRIMARY KEY,
                `value` LONGTEXT NOT NULL,
                `ts` BIGINT NOT NULL
            ) CHARACTER SET utf8mb4"
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
            sqlx::query_scalar(&format!("SELECT `value` FROM `{table}` WHERE `key` = ?"))
                .bind(key.as_bytes())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::read(format!("failed to get {table}/{key}: {e}")))?;

        raw.map(|raw| decode_value(table, key, &raw)).transpose()
    }

    async fn set(&self, table: &str, key: &str, value: &Value) -> StorageResult<()> {
        check_table(table)?;
        check_key(key)?;

        sqlx::query(&format!(
            "INSERT INTO `{table}` (`key`, `value`, `ts`) VALUES (?, ?, ?)
             ON DUPLICATE KEY UPDATE `value` = VALUES(`value`), `ts` = VALUES(`ts`)"
        ))
        .bind(key.as_bytes())
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

        sqlx::query(&format!("DELETE FROM `{table}` WHERE `key` = ?"))
            .bind(key.as_bytes())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(format!("failed to delete {table}/{key}: {e}")))?;

        Ok(())
    }

    async fn get_all(&self, table: &str) -> StorageResult<HashMap<String, Value>> {
        check_table(table)?;

        let rows = sqlx::query(&format!("SELECT `key`, `value` FROM `{table}`"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::read(format!("failed to list {table}: {e}")))?;

        let mut all = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key: Vec<u8> = row
                .try_get("key")
                .map_err(|e| StorageError::read(e.to_string()))?;
            let key = String::from_utf8(key)
                .map_err(|e| StorageError::read(format!("non UTF-8 key in {table}: {e}")))?;
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
// Tests (require running MySQL)
// =============================================================================
