//! Storage Service - process-wide adapter and store factory
//!
//! TigerStyle: Exactly one adapter per service, resolved lazily, once.
//!
//! The host builds one [`StorageService`] at startup and hands clones of it
//! to every plugin. Clones share the same adapter. Tests build a fresh
//! service per test instead of touching global state.
//!
//! Resolution is memoized in flight: when many stores hit their first
//! operation at once, one resolution runs and every caller awaits that
//! same outcome.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::adapter::{BackendKind, StorageAdapter};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::resolver;
use crate::store::Store;

/// Shared handle to the process storage service.
#[derive(Clone)]
pub struct StorageService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: StorageConfig,
    /// `None` once resolution ran and every backend failed.
    adapter: OnceCell<Option<Arc<dyn StorageAdapter>>>,
    resolutions: AtomicUsize,
}

impl StorageService {
    /// Create a service that resolves its backend from `config` on first use.
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                config,
                adapter: OnceCell::new(),
                resolutions: AtomicUsize::new(0),
            }),
        }
    }

    /// Create a service configured from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(StorageConfig::from_env())
    }

    /// Create a service bound to an already-built adapter. Skips resolution.
    #[must_use]
    pub fn with_adapter(adapter: Arc<dyn StorageAdapter>) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                config: StorageConfig::default(),
                adapter: OnceCell::new_with(Some(Some(adapter))),
                resolutions: AtomicUsize::new(0),
            }),
        }
    }

    /// Configuration this service resolves from.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.inner.config
    }

    /// Create the root store for a plugin namespace.
    ///
    /// Performs no I/O.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidName`] if `namespace` is empty,
    /// contains characters outside `[A-Za-z0-9_]`, or would produce a
    /// physical name longer than the backends can address.
    pub fn create_store(&self, namespace: &str) -> StorageResult<Store> {
        Store::root(self.clone(), namespace)
    }

    /// The process adapter, resolving it on first call.
    ///
    /// Crate-private: plugins reach storage only through [`Store`].
    pub(crate) async fn adapter(&self) -> StorageResult<Arc<dyn StorageAdapter>> {
        let inner = &self.inner;
        let resolved = inner
            .adapter
            .get_or_init(|| async {
                inner.resolutions.fetch_add(1, Ordering::SeqCst);
                match resolver::resolve(&inner.config).await {
                    Ok(adapter) => Some(adapter),
                    Err(e) => {
                        tracing::error!(error = %e, "storage resolution failed");
                        None
                    }
                }
            })
            .await;

        resolved.clone().ok_or(StorageError::NoBackend)
    }

    /// Which backend this service uses, resolving it if needed.
    ///
    /// # Errors
    /// Returns [`StorageError::NoBackend`] if resolution failed.
    pub async fn backend_kind(&self) -> StorageResult<BackendKind> {
        Ok(self.adapter().await?.kind())
    }

    /// Close the adapter's connections if one was resolved.
    pub async fn close(&self) {
        if let Some(Some(adapter)) = self.inner.adapter.get() {
            adapter.close().await;
        }
    }

    fn resolution_count(&self) -> usize {
        self.inner.resolutions.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for StorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self.inner.adapter.get() {
            Some(Some(adapter)) => adapter.kind().as_str(),
            Some(None) => "failed",
            None => "unresolved",
        };
        f.debug_struct("StorageService")
            .field("backend", &backend)
            .field("resolutions", &self.resolution_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
