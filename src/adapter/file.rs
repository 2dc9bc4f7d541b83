//! `FileAdapter` - JSON File Fallback
//!
//! TigerStyle: The terminal fallback. Always available, weakest guarantees.
//!
//! # Layout
//!
//! ```text
//! <data_dir>/
//!   plugin_attendance.json          {"config": {...}}
//!   plugin_attendance_records.json  {"user:1": {"streak": 3}}
//! ```
//!
//! Each file is one flat JSON object mapping record keys to values. Files
//! are created on first `set`; a missing file reads as an empty table.
//! Every write rewrites the whole file through a temp file and a rename.
//!
//! Writes to one file are serialized inside this process. Nothing
//! coordinates separate processes, so this backend is only suitable for
//! low write-concurrency workloads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;

use super::{check_key, check_table, BackendKind, StorageAdapter};
use crate::constants::FILE_EXTENSION;
use crate::error::{StorageError, StorageResult};

/// Storage backend writing one JSON file per table.
#[derive(Debug)]
pub struct FileAdapter {
    dir: PathBuf,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileAdapter {
    /// Open (and create if needed) the data directory.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or is not a directory.
    pub async fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::connection("file", format!("{}: {e}", dir.display())))?;

        let meta = fs::metadata(&dir).await?;
        if !meta.is_dir() {
            return Err(StorageError::connection(
                "file",
                format!("{} is not a directory", dir.display()),
            ));
        }

        Ok(Self {
            dir,
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the table files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `table`.
    #[must_use]
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.{FILE_EXTENSION}"))
    }

    fn write_lock(&self, table: &str) -> StorageResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .write_locks
            .lock()
            .map_err(|e| StorageError::write(format!("lock poisoned: {e}")))?;
        Ok(Arc::clone(locks.entry(table.to_string()).or_default()))
    }

    async fn load(&self, table: &str) -> StorageResult<Map<String, Value>> {
        let path = self.table_path(table);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StorageError::read(format!(
                "{} holds a {} instead of an object",
                path.display(),
                json_type(&other)
            ))),
            Err(e) => Err(StorageError::read(format!("{}: {e}", path.display()))),
        }
    }

    async fn store(&self, table: &str, map: Map<String, Value>) -> StorageResult<()> {
        let path = self.table_path(table);
        let tmp = self
            .dir
            .join(format!(".{table}.{}.tmp", uuid::Uuid::new_v4().simple()));

        let bytes = serde_json::to_vec(&Value::Object(map))?;
        fs::write(&tmp, &bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Read-modify-write one file under its write lock.
    async fn update<F>(&self, table: &str, mutate: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Map<String, Value>) -> bool + Send,
    {
        let lock = self.write_lock(table)?;
        let _guard = lock.lock().await;

        let mut map = self.load(table).await?;
        if mutate(&mut map) {
            self.store(table, map).await?;
        }
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl StorageAdapter for FileAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    /// No-op: files are created on first write.
    async fn ensure_table(&self, table: &str) -> StorageResult<()> {
        check_table(table)
    }

    async fn get(&self, table: &str, key: &str) -> StorageResult<Option<Value>> {
        check_table(table)?;
        check_key(key)?;

        let mut map = self.load(table).await?;
        Ok(map.remove(key))
    }

    async fn set(&self, table: &str, key: &str, value: &Value) -> StorageResult<()> {
        check_table(table)?;
        check_key(key)?;

        let value = value.clone();
        self.update(table, move |map| {
            map.insert(key.to_string(), value);
            true
        })
        .await?;

        tracing::trace!(table, key, "file record written");
        Ok(())
    }

    async fn delete(&self, table: &str, key: &str) -> StorageResult<()> {
        check_table(table)?;
        check_key(key)?;

        // Missing keys leave the file untouched
        self.update(table, |map| map.remove(key).is_some()).await
    }

    async fn get_all(&self, table: &str) -> StorageResult<HashMap<String, Value>> {
        check_table(table)?;

        Ok(self.load(table).await?.into_iter().collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio_test::assert_ok;

    const TABLE: &str = "plugin_attendance_records";

    #[tokio::test]
    async fn test_file_crud() {
        let dir = tempdir().unwrap();
        let adapter = FileAdapter::open(dir.path()).await.unwrap();

        assert_ok!(adapter.ensure_table(TABLE).await);
        // Provisioning does not create the file
        assert!(!adapter.table_path(TABLE).exists());
        assert_eq!(adapter.get(TABLE, "user:1").await.unwrap(), None);

        adapter.set(TABLE, "user:1", &json!({"streak": 3})).await.unwrap();
        assert_eq!(
            adapter.get(TABLE, "user:1").await.unwrap(),
            Some(json!({"streak": 3}))
        );

        adapter.delete(TABLE, "user:1").await.unwrap();
        assert_eq!(adapter.get(TABLE, "user:1").await.unwrap(), None);
        assert_ok!(adapter.delete(TABLE, "user:1").await);
    }

    #[tokio::test]
    async fn test_file_format_on_disk() {
        let dir = tempdir().unwrap();
        let adapter = FileAdapter::open(dir.path()).await.unwrap();

        adapter.set(TABLE, "user:1", &json!({"streak": 3})).await.unwrap();

        let path = dir.path().join("plugin_attendance_records.json");
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, json!({"user:1": {"streak": 3}}));

        // No temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_file_persists_across_instances() {
        let dir = tempdir().unwrap();
        {
            let adapter = FileAdapter::open(dir.path()).await.unwrap();
            adapter.set(TABLE, "a", &json!([1, 2, 3])).await.unwrap();
        }
        {
            let adapter = FileAdapter::open(dir.path()).await.unwrap();
            let all = adapter.get_all(TABLE).await.unwrap();
            assert_eq!(all.len(), 1);
            assert_eq!(all["a"], json!([1, 2, 3]));
        }
    }

    #[tokio::test]
    async fn test_file_concurrent_writers_distinct_keys() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(FileAdapter::open(dir.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..32 {
            let adapter = Arc::clone(&adapter);
            handles.push(tokio::spawn(async move {
                adapter.set(TABLE, &format!("k{i}"), &json!(i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let all = adapter.get_all(TABLE).await.unwrap();
        assert_eq!(all.len(), 32);
        assert_eq!(all["k17"], json!(17));
    }

    #[tokio::test]
    async fn test_file_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let adapter = FileAdapter::open(dir.path()).await.unwrap();
        std::fs::write(adapter.table_path(TABLE), b"[1, 2]").unwrap();

        assert!(adapter.get(TABLE, "a").await.is_err());
        // A write must not clobber data it could not parse
        assert!(adapter.set(TABLE, "a", &json!(1)).await.is_err());
        assert_eq!(std::fs::read(adapter.table_path(TABLE)).unwrap(), b"[1, 2]");
    }

    #[tokio::test]
    async fn test_file_open_rejects_regular_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not-a-dir");
        std::fs::write(&path, b"x").unwrap();

        assert!(FileAdapter::open(&path).await.is_err());
    }
}
