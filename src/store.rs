//! Store - Per-Table Façade
//!
//! TigerStyle: Storage is best-effort. Callers never see a storage error
//! from a CRUD call.
//!
//! A [`Store`] is bound to one physical table. On its first operation it
//! resolves the service adapter and provisions its table, both at most
//! once. Every adapter failure after that is logged with the table and key
//! and turned into the operation's safe default:
//!
//! | Operation | Safe default |
//! |-----------|--------------|
//! | `get` / `get_as` | `None` |
//! | `set` / `set_as` / `delete` | no-op |
//! | `get_all` | empty map |
//! | `patch` | `None`, nothing written |
//!
//! Construction errors (bad names, `table()` on a sub-table) are returned
//! synchronously as [`StorageError`] since they are programmer errors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::adapter::StorageAdapter;
use crate::error::{StorageError, StorageResult};
use crate::naming::checked_physical_name;
use crate::service::StorageService;

/// Handle to one namespaced table.
///
/// Cheap to clone. Clones share the readiness state, so a table is
/// provisioned once no matter how many clones use it.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    service: StorageService,
    namespace: String,
    subtable: Option<String>,
    physical_name: String,
    ready: OnceCell<()>,
}

impl Store {
    /// Root store for a namespace.
    pub(crate) fn root(service: StorageService, namespace: &str) -> StorageResult<Self> {
        Self::build(service, namespace, None)
    }

    fn build(
        service: StorageService,
        namespace: &str,
        subtable: Option<&str>,
    ) -> StorageResult<Self> {
        let physical_name = checked_physical_name(namespace, subtable)?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                service,
                namespace: namespace.to_string(),
                subtable: subtable.map(str::to_string),
                physical_name,
                ready: OnceCell::new(),
            }),
        })
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Namespace this store was created for.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Sub-table name, `None` for a root store.
    #[must_use]
    pub fn subtable(&self) -> Option<&str> {
        self.inner.subtable.as_deref()
    }

    /// Name of the backing collection, table or file.
    #[must_use]
    pub fn physical_name(&self) -> &str {
        &self.inner.physical_name
    }

    /// Whether this store may mint sub-tables.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.subtable.is_none()
    }

    // =========================================================================
    // Sub-tables
    // =========================================================================

    /// Open a named sub-table of this namespace.
    ///
    /// Performs no I/O.
    ///
    /// # Errors
    /// Returns [`StorageError::NotRootStore`] when called on a sub-table,
    /// or [`StorageError::InvalidName`] if `name` is not `[A-Za-z0-9_]+` or
    /// the composed physical name would be too long.
    pub fn table(&self, name: &str) -> StorageResult<Store> {
        if !self.is_root() {
            return Err(StorageError::NotRootStore {
                physical_name: self.inner.physical_name.clone(),
            });
        }

        Self::build(self.inner.service.clone(), &self.inner.namespace, Some(name))
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Get a value. `None` if the key is absent or the read failed.
    pub async fn get(&self, key: &str) -> Option<Value> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                self.report("get", Some(key), &e);
                None
            }
        }
    }

    /// Insert or overwrite a value.
    pub async fn set(&self, key: &str, value: Value) {
        if let Err(e) = self.try_set(key, &value).await {
            self.report("set", Some(key), &e);
        }
    }

    /// Remove a key. Removing a missing key does nothing.
    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.try_delete(key).await {
            self.report("delete", Some(key), &e);
        }
    }

    /// Every record in this table. Empty if the read failed.
    pub async fn get_all(&self) -> HashMap<String, Value> {
        match self.try_get_all().await {
            Ok(all) => all,
            Err(e) => {
                self.report("get_all", None, &e);
                HashMap::new()
            }
        }
    }

    /// Whether `get(key)` would return a value.
    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// The stored value, or `fallback` if `get(key)` returns `None`.
    pub async fn get_or_default(&self, key: &str, fallback: Value) -> Value {
        self.get(key).await.unwrap_or(fallback)
    }

    /// Shallow-merge `partial` over the stored object and write it back.
    ///
    /// A missing or non-object current value counts as `{}`. Returns the
    /// merged value that was written, or `None` if `partial` is not an
    /// object or any step failed.
    ///
    /// Not atomic: this is a read followed by a write. Two concurrent
    /// patches of the same key can race and the last write wins.
    pub async fn patch(&self, key: &str, partial: Value) -> Option<Value> {
        let Value::Object(partial) = partial else {
            tracing::warn!(
                table = %self.inner.physical_name,
                key,
                "patch ignored, partial value is not a JSON object"
            );
            return None;
        };

        match self.try_patch(key, partial).await {
            Ok(merged) => Some(merged),
            Err(e) => {
                self.report("patch", Some(key), &e);
                None
            }
        }
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    /// Get a value and deserialize it. `None` if absent, failed, or of the
    /// wrong shape.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                self.report("get_as", Some(key), &e.into());
                None
            }
        }
    }

    /// Serialize a value and store it.
    pub async fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value).await,
            Err(e) => self.report("set_as", Some(key), &e.into()),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolve the adapter and provision this table, each at most once.
    ///
    /// A failed provisioning is not remembered, so the next call retries it.
    async fn adapter(&self) -> StorageResult<Arc<dyn StorageAdapter>> {
        let adapter = self.inner.service.adapter().await?;
        let table = self.inner.physical_name.as_str();
        let provisioner = &adapter;

        self.inner
            .ready
            .get_or_try_init(|| async move {
                provisioner.ensure_table(table).await?;
                tracing::debug!(backend = %provisioner.kind(), table, "table ready");
                Ok::<(), StorageError>(())
            })
            .await?;

        Ok(adapter)
    }

    async fn try_get(&self, key: &str) -> StorageResult<Option<Value>> {
        let adapter = self.adapter().await?;
        adapter.get(&self.inner.physical_name, key).await
    }

    async fn try_set(&self, key: &str, value: &Value) -> StorageResult<()> {
        let adapter = self.adapter().await?;
        adapter.set(&self.inner.physical_name, key, value).await?;
        tracing::trace!(table = %self.inner.physical_name, key, "set");
        Ok(())
    }

    async fn try_delete(&self, key: &str) -> StorageResult<()> {
        let adapter = self.adapter().await?;
        adapter.delete(&self.inner.physical_name, key).await
    }

    async fn try_get_all(&self) -> StorageResult<HashMap<String, Value>> {
        let adapter = self.adapter().await?;
        adapter.get_all(&self.inner.physical_name).await
    }

    async fn try_patch(&self, key: &str, partial: Map<String, Value>) -> StorageResult<Value> {
        let adapter = self.adapter().await?;
        let table = &self.inner.physical_name;

        let mut merged = match adapter.get(table, key).await? {
            Some(Value::Object(current)) => current,
            _ => Map::new(),
        };
        merged.extend(partial);

        let merged = Value::Object(merged);
        adapter.set(table, key, &merged).await?;
        Ok(merged)
    }

    fn report(&self, op: &'static str, key: Option<&str>, error: &StorageError) {
        let table = self.inner.physical_name.as_str();
        match key {
            Some(key) => tracing::error!(table, key, op, error = %error, "storage operation failed"),
            None => tracing::error!(table, op, error = %error, "storage operation failed"),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("namespace", &self.inner.namespace)
            .field("subtable", &self.inner.subtable)
            .field("physical_name", &self.inner.physical_name)
            .field("ready", &self.inner.ready.initialized())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
