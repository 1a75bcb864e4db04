//! Local filesystem store.
//!
//! All entries live in one JSON object on disk. Writes go to a temp file
//! that is then renamed over the original, so a crash never leaves a
//! half-written store behind.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;

/// JSON-file backed store.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl LocalStore {
    /// Create a store backed by the given file. The file is created on
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Read the whole store, empty if the file doesn't exist.
    async fn read_all(&self) -> Result<HashMap<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::storage(format!("{} is not a JSON object: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write the whole store atomically (write to temp, then rename).
    async fn write_all(&self, entries: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.remove_entry(key))
            .collect())
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.extend(items);
        self.write_all(&entries).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        let before = entries.len();
        for key in keys {
            entries.remove(key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.write_all(&entries).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("store.json"));

        store
            .set(HashMap::from([("rating_x".to_string(), json!({ "v": 1 }))]))
            .await
            .unwrap();

        let found = store.get(&["rating_x".to_string()]).await.unwrap();
        assert_eq!(found["rating_x"], json!({ "v": 1 }));
        assert!(!tmp.path().join("store.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("nested/dir/store.json"));

        assert!(store.get(&["nope".to_string()]).await.unwrap().is_empty());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_merges_with_existing_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let store = LocalStore::new(&path);

        store
            .set(HashMap::from([("a".to_string(), json!(1))]))
            .await
            .unwrap();
        store
            .set(HashMap::from([("b".to_string(), json!(2))]))
            .await
            .unwrap();

        // A fresh handle sees what the first one persisted.
        let reopened = LocalStore::new(&path);
        let mut keys = reopened.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        reopened.remove(&["a".to_string()]).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_storage_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let store = LocalStore::new(&path);
        assert!(matches!(
            store.keys().await.unwrap_err(),
            AppError::Storage(_)
        ));
    }
}
