//! Storage Errors
//!
//! TigerStyle: Explicit error types with context.
//!
//! Three families:
//! - configuration errors (bad names, sub-table of a sub-table) surface
//!   synchronously from the store factory,
//! - resolution errors are recorded per backend attempt and only surface
//!   when every backend, file fallback included, failed,
//! - operation errors are swallowed and logged by the [`Store`](crate::Store) façade.

use thiserror::Error;

/// Errors from storage configuration, resolution and operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Namespace or sub-table name rejected
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The rejected identifier
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// `table()` called on a handle that is itself a sub-table
    #[error("sub-tables can only be created from a root store (got {physical_name})")]
    NotRootStore {
        /// Physical name of the offending handle
        physical_name: String,
    },

    /// A configured backend could not be reached
    #[error("{backend} connection failed: {message}")]
    Connection {
        /// Backend that failed
        backend: String,
        /// Driver message
        message: String,
    },

    /// A backend was configured but its support was not compiled in
    #[error("{backend} support not compiled in (enable the `{backend}` feature)")]
    Unavailable {
        /// Backend name, equal to its cargo feature
        backend: String,
    },

    /// Every backend including the file fallback failed
    #[error("no storage backend available")]
    NoBackend,

    /// Query or command failed against a healthy backend
    #[error("query error: {message}")]
    Query {
        /// Error message
        message: String,
    },

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be converted to or from JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Create an invalid name error.
    #[must_use]
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create an unavailable-backend error.
    #[must_use]
    pub fn unavailable(backend: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
        }
    }

    /// Create a query error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a read error (wraps query error for reads).
    #[must_use]
    pub fn read(message: impl Into<String>) -> Self {
        Self::Query {
            message: format!("read: {}", message.into()),
        }
    }

    /// Create a write error (wraps query error for writes).
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::Query {
            message: format!("write: {}", message.into()),
        }
    }

    /// Programmer errors raised synchronously by the factory.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidName { .. } | Self::NotRootStore { .. })
    }

    /// Errors that only occur while picking a backend.
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Unavailable { .. } | Self::NoBackend
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
