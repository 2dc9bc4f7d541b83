//! TigerStyle Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_LIMIT`.
//! Every constant includes units in the name (`_BYTES_MAX`, `_MS_DEFAULT`, `_COUNT_MAX`).

// =============================================================================
// Naming
// =============================================================================

/// Prefix shared by every physical table, collection and file name.
pub const PHYSICAL_NAME_PREFIX: &str = "plugin_";

/// Separator between the namespace and sub-table parts of a physical name.
pub const PHYSICAL_NAME_SEPARATOR: char = '_';

/// Maximum length of a namespace or sub-table identifier.
pub const IDENTIFIER_BYTES_MAX: usize = 64;

/// Maximum length of a composed physical name.
///
/// Postgres truncates identifiers past 63 bytes and MySQL rejects them
/// past 64, so longer names would alias or fail.
pub const PHYSICAL_NAME_BYTES_MAX: usize = 63;

/// Maximum length of a record key.
///
/// Bounded by the MySQL `VARBINARY(255)` primary key column.
pub const RECORD_KEY_BYTES_MAX: usize = 255;

// =============================================================================
// Environment
// =============================================================================

/// Document-store endpoint (`ws://`, `wss://`, `http://`, `mem://`, ...).
pub const ENV_DOCUMENT_URL: &str = "PLUGSTORE_DOCUMENT_URL";

/// PostgreSQL connection URL.
pub const ENV_POSTGRES_URL: &str = "PLUGSTORE_POSTGRES_URL";

/// MySQL / MariaDB connection URL.
pub const ENV_MYSQL_URL: &str = "PLUGSTORE_MYSQL_URL";

/// Path of the embedded SQLite database file.
pub const ENV_SQLITE_PATH: &str = "PLUGSTORE_SQLITE_PATH";

/// Directory holding the file backend's JSON files.
pub const ENV_DATA_DIR: &str = "PLUGSTORE_DATA_DIR";

/// Connect / pool-acquire timeout in milliseconds.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "PLUGSTORE_CONNECT_TIMEOUT_MS";

// =============================================================================
// Defaults
// =============================================================================

/// Default directory for the file backend.
pub const DATA_DIR_DEFAULT: &str = "./data";

/// Default connect / acquire timeout.
pub const CONNECT_TIMEOUT_MS_DEFAULT: u64 = 5_000;

/// Maximum accepted connect timeout (10 minutes).
pub const CONNECT_TIMEOUT_MS_MAX: u64 = 600_000;

/// Default pool size for the networked relational backends.
pub const POOL_CONNECTIONS_COUNT_DEFAULT: u32 = 10;

/// Maximum pool size for the networked relational backends.
pub const POOL_CONNECTIONS_COUNT_MAX: u32 = 100;

/// SQLite busy timeout; writers wait this long for the database lock.
pub const SQLITE_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite pool size. WAL allows concurrent readers, writes still serialize.
pub const SQLITE_POOL_CONNECTIONS_COUNT: u32 = 4;

/// SurrealDB namespace used by the document backend.
pub const DOCUMENT_NAMESPACE: &str = "plugstore";

/// SurrealDB database used by the document backend.
pub const DOCUMENT_DATABASE: &str = "main";

/// Extension of the file backend's per-table files.
pub const FILE_EXTENSION: &str = "json";
