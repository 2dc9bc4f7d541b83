//! Backend Resolver
//!
//! Walks [`StorageConfig::candidates`] in priority order and returns the
//! first adapter that connects:
//!
//! ```text
//! document ─fail→ postgres ─fail→ mysql ─fail→ sqlite ─fail→ file
//!    │ok             │ok            │ok          │ok          │ok
//!    └───────────────┴──────────────┴────────────┴────────────┴──→ adapter
//! ```
//!
//! Each attempt builds its own client or pool. A failed attempt drops
//! everything it created before the next one starts.

use std::sync::Arc;

use crate::adapter::{FileAdapter, StorageAdapter};
use crate::config::{BackendConfig, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// Resolve the adapter for this process.
///
/// # Errors
/// Returns [`StorageError::NoBackend`] only if every candidate, including
/// the file fallback, failed.
pub async fn resolve(config: &StorageConfig) -> StorageResult<Arc<dyn StorageAdapter>> {
    let candidates = config.candidates();
    assert!(!candidates.is_empty(), "candidate list must end with the file backend");

    for candidate in &candidates {
        let backend = candidate.kind();
        match connect(candidate, config).await {
            Ok(adapter) => {
                tracing::info!(%backend, "storage backend selected");
                return Ok(adapter);
            }
            Err(e) => {
                tracing::warn!(%backend, error = %e, "storage backend unavailable, trying next");
            }
        }
    }

    tracing::error!(
        attempts = candidates.len(),
        "every storage backend failed, including the file fallback"
    );
    Err(StorageError::NoBackend)
}

/// Build the adapter for a single candidate.
///
/// # Errors
/// Returns a connection error if the backend is unreachable, or
/// [`StorageError::Unavailable`] if its support was compiled out.
pub async fn connect(
    candidate: &BackendConfig,
    config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    match candidate {
        BackendConfig::Document { url } => connect_document(url, config).await,
        BackendConfig::Postgres { url } => connect_postgres(url, config).await,
        BackendConfig::Mysql { url } => connect_mysql(url, config).await,
        BackendConfig::Sqlite { path } => connect_sqlite(path, config).await,
        BackendConfig::File { dir } => Ok(Arc::new(FileAdapter::open(dir).await?)),
    }
}

// =============================================================================
// Per-backend constructors (feature gated)
// =============================================================================

#[cfg(feature = "document")]
async fn connect_document(
    url: &str,
    config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    let adapter = crate::adapter::DocumentAdapter::connect(url, config.connect_timeout).await?;
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "document"))]
async fn connect_document(
    _url: &str,
    _config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    Err(StorageError::unavailable("document"))
}

#[cfg(feature = "postgres")]
async fn connect_postgres(
    url: &str,
    config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    let adapter = crate::adapter::PostgresAdapter::connect(
        url,
        config.pool_connections_max,
        config.connect_timeout,
    )
    .await?;
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(
    _url: &str,
    _config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    Err(StorageError::unavailable("postgres"))
}

#[cfg(feature = "mysql")]
async fn connect_mysql(url: &str, config: &StorageConfig) -> StorageResult<Arc<dyn StorageAdapter>> {
    let adapter = crate::adapter::MysqlAdapter::connect(
        url,
        config.pool_connections_max,
        config.connect_timeout,
    )
    .await?;
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "mysql"))]
async fn connect_mysql(
    _url: &str,
    _config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    Err(StorageError::unavailable("mysql"))
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(
    path: &std::path::Path,
    config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    let adapter = crate::adapter::SqliteAdapter::open(path, config.connect_timeout).await?;
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(
    _path: &std::path::Path,
    _config: &StorageConfig,
) -> StorageResult<Arc<dyn StorageAdapter>> {
    Err(StorageError::unavailable("sqlite"))
}

// =============================================================================
// Tests
// =============================================================================
