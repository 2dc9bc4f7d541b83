//! `MemoryAdapter` - In-Process Storage for Testing
//!
//! TigerStyle: Deterministic testing with fault injection.
//!
//! Tables live in a `HashMap` behind a `RwLock`. A failure switch makes
//! every operation return an error so callers can exercise their
//! safe-default paths, and a provisioning counter lets tests check that
//! `ensure_table` runs once per store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{check_key, check_table, now_ms, BackendKind, StorageAdapter};
use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
struct Record {
    value: Value,
    ts: i64,
}

/// In-memory adapter for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    tables: RwLock<HashMap<String, HashMap<String, Record>>>,
    provisioned: RwLock<HashSet<String>>,
    ensure_calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryAdapter {
    /// Create an empty adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `ensure_table` calls received so far.
    #[must_use]
    pub fn ensure_table_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    /// Whether `ensure_table` has succeeded for `table`.
    #[must_use]
    pub fn is_provisioned(&self, table: &str) -> bool {
        self.provisioned
            .read()
            .map(|set| set.contains(table))
            .unwrap_or(false)
    }

    /// Timestamp of the last write to `key`, in unix milliseconds.
    #[must_use]
    pub fn updated_at(&self, table: &str, key: &str) -> Option<i64> {
        let tables = self.tables.read().ok()?;
        tables.get(table)?.get(key).map(|r| r.ts)
    }

    fn check_fault(&self, op: &str) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::query(format!("simulated fault: {op}")));
        }
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::query(format!("lock poisoned: {e}"))
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn ensure_table(&self, table: &str) -> StorageResult<()> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fault("ensure_table")?;
        check_table(table)?;

        self.provisioned
            .write()
            .map_err(poisoned)?
            .insert(table.to_string());
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> StorageResult<Option<Value>> {
        self.check_fault("get")?;
        check_table(table)?;
        check_key(key)?;

        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(key))
            .map(|r| r.value.clone()))
    }

    async fn set(&self, table: &str, key: &str, value: &Value) -> StorageResult<()> {
        self.check_fault("set")?;
        check_table(table)?;
        check_key(key)?;

        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.entry(table.to_string()).or_default().insert(
            key.to_string(),
            Record {
                value: value.clone(),
                ts: now_ms(),
            },
        );
        Ok(())
    }

    async fn delete(&self, table: &str, key: &str) -> StorageResult<()> {
        self.check_fault("delete")?;
        check_table(table)?;
        check_key(key)?;

        let mut tables = self.tables.write().map_err(poisoned)?;
        if let Some(rows) = tables.get_mut(table) {
            rows.remove(key);
        }
        Ok(())
    }

    async fn get_all(&self, table: &str) -> StorageResult<HashMap<String, Value>> {
        self.check_fault("get_all")?;
        check_table(table)?;

        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|(k, r)| (k.clone(), r.value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

// =============================================================================
// Tests
// =============================================================================
