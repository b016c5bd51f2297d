//! Plugin-scoped key-value persistence.
//!
//! Each named store is one JSON object file mapping keys to opaque string
//! values. Writes replace the whole file atomically (temp file + rename) under
//! an exclusive advisory lock on a sibling `.lock` file. `update` holds that
//! lock across read, change and write, so read-modify-write cycles from
//! separate handles or processes never interleave. Locked file IO runs on the
//! blocking pool.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fs2::FileExt;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors from a key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blocking store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Store did not apply the update for key: {0}")]
    UpdateNotApplied(String),
}

/// Change applied by [`KeyValueStore::update`]: receives the current value,
/// returns the replacement or `None` to leave the key untouched
pub type UpdateFn<'a> =
    dyn FnMut(Option<String>) -> Result<Option<String>, StoreError> + Send + 'a;

/// Get/set of opaque string values under string keys
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Atomic read-modify-write of one key
    async fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        (**self).update(key, change).await
    }
}

/// File-backed store: `<dir>/<name>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by an explicit file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Open the named store inside a directory
    pub fn open(dir: &Path, name: &str) -> Self {
        Self::new(dir.join(format!("{}.json", name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Open (and create) the lock file, ensuring the directory exists
    fn lock_file(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.lock_path())?)
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let file = File::open(&self.path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Run locked file IO on the blocking pool
    async fn blocking<T, F>(&self, task: F) -> Result<T, StoreError>
    where
        F: FnOnce(JsonFileStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || task(store)).await?
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, map)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.blocking(move |store| {
            // Lock is released when file is dropped
            let lock = store.lock_file()?;
            lock.lock_shared()?;

            let map = store.read_map()?;
            Ok(map.get(&key).cloned())
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(key, &mut |_: Option<String>| Ok(Some(value.to_string())))
            .await
    }

    async fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        let (lock, mut map) = self
            .blocking(|store| {
                let lock = store.lock_file()?;
                lock.lock_exclusive()?;

                let map = store.read_map()?;
                Ok((lock, map))
            })
            .await?;

        let Some(value) = change(map.get(key).cloned())? else {
            return Ok(());
        };
        map.insert(key.to_string(), value);

        self.blocking(move |store| {
            store.write_map(&map)?;
            drop(lock);
            Ok(())
        })
        .await?;

        debug!(path = %self.path.display(), key, "Store value written");
        Ok(())
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = change(values.get(key).cloned())? {
            values.insert(key.to_string(), value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(&temp.path().join("store"), "favorites");

        assert_eq!(store.get("list").await.unwrap(), None);

        store.set("list", "[]").await.unwrap();
        store.set("other", "x").await.unwrap();
        assert_eq!(store.get("list").await.unwrap(), Some("[]".to_string()));
        assert_eq!(store.get("other").await.unwrap(), Some("x".to_string()));

        // A second handle on the same file sees the writes
        let reopened = JsonFileStore::open(&temp.path().join("store"), "favorites");
        assert_eq!(reopened.get("list").await.unwrap(), Some("[]".to_string()));
        assert!(temp.path().join("store").join("favorites.json").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path(), "broken");
        std::fs::write(store.path(), "not json").unwrap();

        let result = store.get("list").await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_update_skips_write_when_unchanged() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path(), "favorites");

        store
            .update("list", &mut |current: Option<String>| {
                assert_eq!(current, None);
                Ok(None)
            })
            .await
            .unwrap();
        assert!(!store.path().exists());

        store.set("list", "[1]").await.unwrap();
        store
            .update("list", &mut |current: Option<String>| {
                Ok(current.map(|v| v.replace(']', ",2]")))
            })
            .await
            .unwrap();
        assert_eq!(store.get("list").await.unwrap(), Some("[1,2]".to_string()));
    }

    #[tokio::test]
    async fn test_update_error_leaves_value() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();

        let result = store
            .update("k", &mut |_: Option<String>| {
                Err(StoreError::UpdateNotApplied("k".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_update_is_atomic_across_handles() {
        let temp = TempDir::new().unwrap();
        let mut handles = Vec::new();

        for _ in 0..40 {
            // Separate handles take the file lock independently
            let store = JsonFileStore::open(temp.path(), "counter");
            handles.push(tokio::spawn(async move {
                store
                    .update("n", &mut |current: Option<String>| {
                        let n: u32 = current.as_deref().unwrap_or("0").parse().unwrap();
                        Ok(Some((n + 1).to_string()))
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let store = JsonFileStore::open(temp.path(), "counter");
        assert_eq!(store.get("n").await.unwrap(), Some("40".to_string()));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }
}
