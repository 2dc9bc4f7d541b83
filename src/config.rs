//! Storage Configuration
//!
//! TigerStyle: Sensible defaults, builder pattern, explicit over implicit.
//!
//! The backend is never chosen by a plugin. The host reads a
//! [`StorageConfig`] once (usually from the environment) and the resolver
//! walks [`StorageConfig::candidates`] in priority order.

use std::path::PathBuf;
use std::time::Duration;

use crate::adapter::BackendKind;
use crate::constants::{
    CONNECT_TIMEOUT_MS_DEFAULT, CONNECT_TIMEOUT_MS_MAX, DATA_DIR_DEFAULT, ENV_CONNECT_TIMEOUT_MS,
    ENV_DATA_DIR, ENV_DOCUMENT_URL, ENV_MYSQL_URL, ENV_POSTGRES_URL, ENV_SQLITE_PATH,
    POOL_CONNECTIONS_COUNT_DEFAULT, POOL_CONNECTIONS_COUNT_MAX,
};

// =============================================================================
// BackendConfig
// =============================================================================

/// One concrete backend the resolver may try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Document store endpoint
    Document {
        /// SurrealDB endpoint, e.g. `ws://localhost:8000` or `mem://`
        url: String,
    },
    /// PostgreSQL
    Postgres {
        /// `postgres://` URL
        url: String,
    },
    /// MySQL / MariaDB
    Mysql {
        /// `mysql://` URL
        url: String,
    },
    /// Embedded SQLite file
    Sqlite {
        /// Database file path
        path: PathBuf,
    },
    /// One JSON file per table
    File {
        /// Directory holding the files
        dir: PathBuf,
    },
}

impl BackendConfig {
    /// Which adapter this configuration produces.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Document { .. } => BackendKind::Document,
            Self::Postgres { .. } => BackendKind::Postgres,
            Self::Mysql { .. } => BackendKind::Mysql,
            Self::Sqlite { .. } => BackendKind::Sqlite,
            Self::File { .. } => BackendKind::File,
        }
    }
}

// =============================================================================
// StorageConfig
// =============================================================================

/// Process-wide storage configuration.
///
/// # Example
///
/// ```rust
/// use plugstore::StorageConfig;
///
/// let config = StorageConfig::default()
///     .with_sqlite_path("/var/lib/host/plugins.db")
///     .with_data_dir("/var/lib/host/plugins");
/// assert_eq!(config.candidates().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Document store endpoint.
    pub document_url: Option<String>,

    /// PostgreSQL URL.
    pub postgres_url: Option<String>,

    /// MySQL URL.
    pub mysql_url: Option<String>,

    /// SQLite database file.
    pub sqlite_path: Option<PathBuf>,

    /// File backend directory.
    ///
    /// Default: `./data`
    pub data_dir: PathBuf,

    /// Connect / pool-acquire timeout for each backend attempt.
    ///
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Maximum pool size for Postgres and MySQL.
    ///
    /// Default: 10
    pub pool_connections_max: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            document_url: None,
            postgres_url: None,
            mysql_url: None,
            sqlite_path: None,
            data_dir: PathBuf::from(DATA_DIR_DEFAULT),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS_DEFAULT),
            pool_connections_max: POOL_CONNECTIONS_COUNT_DEFAULT,
        }
    }
}

impl StorageConfig {
    /// Create a config with no networked backend; resolves to the file backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Empty and whitespace-only values count as unset.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.document_url = var(ENV_DOCUMENT_URL);
        config.postgres_url = var(ENV_POSTGRES_URL);
        config.mysql_url = var(ENV_MYSQL_URL);
        config.sqlite_path = var(ENV_SQLITE_PATH).map(|p| expand_path(&p));
        if let Some(dir) = var(ENV_DATA_DIR) {
            config.data_dir = expand_path(&dir);
        }
        if let Some(raw) = var(ENV_CONNECT_TIMEOUT_MS) {
            match raw.parse::<u64>() {
                Ok(ms) if (1..=CONNECT_TIMEOUT_MS_MAX).contains(&ms) => {
                    config = config.with_connect_timeout(Duration::from_millis(ms));
                }
                _ => tracing::warn!(
                    variable = ENV_CONNECT_TIMEOUT_MS,
                    value = %raw,
                    "ignoring invalid timeout"
                ),
            }
        }
        config
    }

    /// Set the document store endpoint.
    #[must_use]
    pub fn with_document_url(mut self, url: impl Into<String>) -> Self {
        self.document_url = Some(url.into());
        self
    }

    /// Set the PostgreSQL URL.
    #[must_use]
    pub fn with_postgres_url(mut self, url: impl Into<String>) -> Self {
        self.postgres_url = Some(url.into());
        self
    }

    /// Set the MySQL URL.
    #[must_use]
    pub fn with_mysql_url(mut self, url: impl Into<String>) -> Self {
        self.mysql_url = Some(url.into());
        self
    }

    /// Set the SQLite database file.
    #[must_use]
    pub fn with_sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_path = Some(path.into());
        self
    }

    /// Set the file backend directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the per-attempt connect timeout.
    ///
    /// # Panics
    /// Panics if `timeout` is zero or exceeds `CONNECT_TIMEOUT_MS_MAX`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "connect timeout must be positive");
        assert!(
            timeout <= Duration::from_millis(CONNECT_TIMEOUT_MS_MAX),
            "connect timeout {timeout:?} exceeds max {CONNECT_TIMEOUT_MS_MAX}ms"
        );
        self.connect_timeout = timeout;
        self
    }

    /// Set the relational pool size.
    ///
    /// # Panics
    /// Panics if `count` is zero or exceeds `POOL_CONNECTIONS_COUNT_MAX`.
    #[must_use]
    pub fn with_pool_connections_max(mut self, count: u32) -> Self {
        assert!(count > 0, "pool must allow at least one connection");
        assert!(
            count <= POOL_CONNECTIONS_COUNT_MAX,
            "pool size {count} exceeds max {POOL_CONNECTIONS_COUNT_MAX}"
        );
        self.pool_connections_max = count;
        self
    }

    /// Backends to attempt, highest priority first.
    ///
    /// Always ends with [`BackendConfig::File`], the terminal fallback.
    #[must_use]
    pub fn candidates(&self) -> Vec<BackendConfig> {
        let mut candidates = Vec::with_capacity(5);
        if let Some(url) = &self.document_url {
            candidates.push(BackendConfig::Document { url: url.clone() });
        }
        if let Some(url) = &self.postgres_url {
            candidates.push(BackendConfig::Postgres { url: url.clone() });
        }
        if let Some(url) = &self.mysql_url {
            candidates.push(BackendConfig::Mysql { url: url.clone() });
        }
        if let Some(path) = &self.sqlite_path {
            candidates.push(BackendConfig::Sqlite { path: path.clone() });
        }
        candidates.push(BackendConfig::File {
            dir: self.data_dir.clone(),
        });

        // Postcondition
        assert!(
            matches!(candidates.last(), Some(BackendConfig::File { .. })),
            "file backend must be the last candidate"
        );

        candidates
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

// =============================================================================
// Tests
// =============================================================================
