//! Adapters - Backend Trait and Implementations
//!
//! TigerStyle: One contract, many persistence mechanics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageAdapter Trait                      │
//! │     ensure_table / get / set / delete / get_all              │
//! └─────────────────────────────────────────────────────────────┘
//!    ↑            ↑            ↑            ↑           ↑
//! Document     Postgres      MySQL       SQLite       File
//! (surrealdb)  (sqlx)        (sqlx)      (sqlx, WAL)  (JSON files)
//! ```
//!
//! `MemoryAdapter` implements the same contract in-process for tests.
//!
//! Every method takes a physical table name produced by
//! [`physical_name`](crate::naming::physical_name). Relational adapters
//! interpolate it into SQL, so they reject anything else up front.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::constants::RECORD_KEY_BYTES_MAX;
use crate::error::{StorageError, StorageResult};
use crate::naming::is_physical_name;

mod file;
mod memory;

#[cfg(feature = "document")]
mod document;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use file::FileAdapter;
pub use memory::MemoryAdapter;

#[cfg(feature = "document")]
pub use document::DocumentAdapter;
#[cfg(feature = "mysql")]
pub use mysql::MysqlAdapter;
#[cfg(feature = "postgres")]
pub use postgres::PostgresAdapter;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAdapter;

// =============================================================================
// BackendKind
// =============================================================================

/// The storage technology behind an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Document store
    Document,
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    Mysql,
    /// Embedded SQLite
    Sqlite,
    /// JSON file per table
    File,
    /// In-process map, never chosen by the resolver
    Memory,
}

impl BackendKind {
    /// Get string representation. Matches the cargo feature name where one exists.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// StorageAdapter
// =============================================================================

/// Uniform CRUD contract every backend implements.
///
/// One adapter instance is shared by every store in the process and owns
/// whatever connection pool its backend needs.
#[async_trait]
pub trait StorageAdapter: Send + Sync + fmt::Debug {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Create the physical resource if absent.
    ///
    /// Idempotent and safe to race. May be a no-op for backends that
    /// create resources on first write.
    async fn ensure_table(&self, table: &str) -> StorageResult<()>;

    /// Get a value by key. Returns `None` if the key does not exist.
    async fn get(&self, table: &str, key: &str) -> StorageResult<Option<Value>>;

    /// Insert or overwrite a value, recording a fresh timestamp.
    async fn set(&self, table: &str, key: &str, value: &Value) -> StorageResult<()>;

    /// Hard-delete a key. Deleting a missing key is not an error.
    async fn delete(&self, table: &str, key: &str) -> StorageResult<()>;

    /// Snapshot of every record in the table, unordered.
    async fn get_all(&self, table: &str) -> StorageResult<HashMap<String, Value>>;

    /// Release pooled connections.
    async fn close(&self) {}
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Reject table names that are not derived physical names.
pub(crate) fn check_table(table: &str) -> StorageResult<()> {
    if is_physical_name(table) {
        Ok(())
    } else {
        Err(StorageError::query(format!(
            "refusing unsafe table name {table:?}"
        )))
    }
}

/// Reject empty or oversized record keys.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::query("record key must not be empty"));
    }
    if key.len() > RECORD_KEY_BYTES_MAX {
        return Err(StorageError::query(format!(
            "record key {} bytes exceeds max {RECORD_KEY_BYTES_MAX}",
            key.len()
        )));
    }
    Ok(())
}

/// Unix milliseconds for the `ts` column.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Encode a value for a text column.
#[cfg_attr(
    not(any(
        feature = "document",
        feature = "postgres",
        feature = "mysql",
        feature = "sqlite"
    )),
    allow(dead_code)
)]
pub(crate) fn encode_value(value: &Value) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a text column back into a value.
#[cfg_attr(
    not(any(
        feature = "document",
        feature = "postgres",
        feature = "mysql",
        feature = "sqlite"
    )),
    allow(dead_code)
)]
pub(crate) fn decode_value(table: &str, key: &str, raw: &str) -> StorageResult<Value> {
    serde_json::from_str(raw).map_err(|e| {
        StorageError::read(format!("corrupt value for {table}/{key}: {e}"))
    })
}

// =============================================================================
// Tests
// =============================================================================
