//! `DocumentAdapter` - Document Store Backend
//!
//! One SurrealDB table (collection) per physical name, one document per
//! record. The record id is the caller's key, so `set` is a native upsert
//! by id and no schema step is needed: tables appear on first write.
//!
//! # Connection Strings
//!
//! | Mode | Endpoint |
//! |------|----------|
//! | Server | `ws://host:8000`, `wss://host`, `http://host:8000` |
//! | In-process (tests) | `mem://` |
//!
//! # Document shape
//!
//! ```text
//! plugin_attendance_records:⟨user:1⟩ { key: "user:1", value: "{\"streak\":3}", ts: 1760000000000 }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;

use super::{
    check_key, check_table, decode_value, encode_value, now_ms, BackendKind, StorageAdapter,
};
use crate::constants::{DOCUMENT_DATABASE, DOCUMENT_NAMESPACE};
use crate::error::{StorageError, StorageResult};

/// One stored record.
#[derive(Debug, Serialize, Deserialize)]
struct DocumentRow {
    key: String,
    value: String,
    ts: i64,
}

/// Document store backend.
pub struct DocumentAdapter {
    db: Surreal<Any>,
}

impl std::fmt::Debug for DocumentAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAdapter").finish_non_exhaustive()
    }
}

fn map_db_err(e: surrealdb::Error) -> StorageError {
    StorageError::query(e.to_string())
}

impl DocumentAdapter {
    /// Connect to a document store endpoint.
    ///
    /// # Errors
    /// Returns [`StorageError::Connection`] if the endpoint is unreachable
    /// within `timeout` or rejects the namespace selection.
    pub async fn connect(endpoint: &str, timeout: Duration) -> StorageResult<Self> {
        let db: Surreal<Any> = Surreal::init();

        tokio::time::timeout(timeout, db.connect(endpoint))
            .await
            .map_err(|_| {
                StorageError::connection("document", format!("timed out after {timeout:?}"))
            })?
            .map_err(|e: surrealdb::Error| StorageError::connection("document", e.to_string()))?;

        db.use_ns(DOCUMENT_NAMESPACE)
            .use_db(DOCUMENT_DATABASE)
            .await
            .map_err(|e: surrealdb::Error| StorageError::connection("document", e.to_string()))?;

        Ok(Self { db })
    }

    /// Get a reference to the underlying client.
    #[must_use]
    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}

#[async_trait]
impl StorageAdapter for DocumentAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    /// No-op: collections are created by the first upsert.
    async fn ensure_table(&self, table: &str) -> StorageResult<()> {
        check_table(table)
    }

    async fn get(&self, table: &str, key: &str) -> StorageResult<Option<Value>> {
        check_table(table)?;
        check_key(key)?;

        let row: Option<DocumentRow> = self
            .db
            .select((table, key))
            .await
            .map_err(map_db_err)?;

        row.map(|row| decode_value(table, key, &row.value))
            .transpose()
    }

    async fn set(&self, table: &str, key: &str, value: &Value) -> StorageResult<()> {
        check_table(table)?;
        check_key(key)?;

        let row = DocumentRow {
            key: key.to_string(),
            value: encode_value(value)?,
            ts: now_ms(),
        };
        let _: Option<DocumentRow> = self
            .db
            .upsert((table, key))
            .content(row)
            .await
            .map_err(map_db_err)?;

        Ok(())
    }

    async fn delete(&self, table: &str, key: &str) -> StorageResult<()> {
        check_table(table)?;
        check_key(key)?;

        let _: Option<DocumentRow> = self
            .db
            .delete((table, key))
            .await
            .map_err(map_db_err)?;

        Ok(())
    }

    async fn get_all(&self, table: &str) -> StorageResult<HashMap<String, Value>> {
        check_table(table)?;

        let rows: Vec<DocumentRow> = self
            .db
            .select(table)
            .await
            .map_err(map_db_err)?;

        let mut all = HashMap::with_capacity(rows.len());
        for row in rows {
            let value = decode_value(table, &row.key, &row.value)?;
            all.insert(row.key, value);
        }
        Ok(all)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TABLE: &str = "plugin_attendance_records";

    async fn memory_adapter() -> DocumentAdapter {
        DocumentAdapter::connect("mem://", Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_document_crud() {
        let adapter = memory_adapter().await;
        adapter.ensure_table(TABLE).await.unwrap();

        assert_eq!(adapter.get(TABLE, "user:1").await.unwrap(), None);

        adapter.set(TABLE, "user:1", &json!({"streak": 3})).await.unwrap();
        assert_eq!(
            adapter.get(TABLE, "user:1").await.unwrap(),
            Some(json!({"streak": 3}))
        );

        adapter.set(TABLE, "user:1", &json!({"streak": 4})).await.unwrap();
        assert_eq!(
            adapter.get(TABLE, "user:1").await.unwrap(),
            Some(json!({"streak": 4}))
        );

        adapter.delete(TABLE, "user:1").await.unwrap();
        assert_eq!(adapter.get(TABLE, "user:1").await.unwrap(), None);
        adapter.delete(TABLE, "user:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_document_get_all_per_collection() {
        let adapter = memory_adapter().await;

        adapter.set(TABLE, "a", &json!(1)).await.unwrap();
        adapter.set(TABLE, "b", &json!("two")).await.unwrap();
        adapter.set("plugin_other", "a", &json!(false)).await.unwrap();

        let all = adapter.get_all(TABLE).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], json!(1));
        assert_eq!(all["b"], json!("two"));

        assert!(adapter.get_all("plugin_empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_unreachable_endpoint() {
        let result =
            DocumentAdapter::connect("ws://127.0.0.1:1", Duration::from_millis(500)).await;
        assert!(matches!(result, Err(StorageError::Connection { .. })));
    }
}
