//! Plugstore - Namespaced Key-Value Storage for Plugins
//!
//! TigerStyle: One contract, five backends, no storage errors leaking into
//! plugin code.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StorageService (one per process, cheap to clone)            │
//! │    create_store(namespace) ──→ Store (root)                  │
//! │                                  └─ table(name) ──→ Store    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Resolver: document → postgres → mysql → sqlite → file       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  StorageAdapter: ensure_table / get / set / delete / get_all │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each [`Store`] maps to one physical table named
//! `plugin_<namespace>[_<subtable>]`. The backend is picked lazily on the
//! first store operation from environment configuration and shared by
//! every store for the life of the service.
//!
//! # Usage
//!
//! ```no_run
//! use plugstore::{json, StorageConfig, StorageService};
//!
//! # async fn demo() -> plugstore::StorageResult<()> {
//! let service = StorageService::new(StorageConfig::from_env());
//! let records = service.create_store("attendance")?.table("records")?;
//!
//! records.set("user:1", json!({"streak": 3})).await;
//! assert_eq!(records.get("user:1").await, Some(json!({"streak": 3})));
//! assert!(!records.has("user:2").await);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod config;
pub mod constants;
pub mod error;
pub mod naming;
pub mod resolver;
pub mod service;
pub mod store;

pub use adapter::{BackendKind, FileAdapter, MemoryAdapter, StorageAdapter};
pub use config::{BackendConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use naming::{checked_physical_name, physical_name, sanitize, validate_identifier};
pub use service::StorageService;
pub use store::Store;

#[cfg(feature = "document")]
pub use adapter::DocumentAdapter;
#[cfg(feature = "mysql")]
pub use adapter::MysqlAdapter;
#[cfg(feature = "postgres")]
pub use adapter::PostgresAdapter;
#[cfg(feature = "sqlite")]
pub use adapter::SqliteAdapter;

pub use serde_json::{json, Value};
