//! Keyed record store
//!
//! A string-keyed map held fully in memory and mirrored to a pretty-printed
//! JSON file. Loading never fails (a missing or corrupt file yields an empty
//! store) and saving never raises (failures are logged and reported as
//! `false`).

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Errors raised while reading or writing a store file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A JSON-file backed map from string keys to `V`
pub struct JsonStore<V> {
    path: PathBuf,
    entries: DashMap<String, V>,
    // Serializes whole-file writes; entry mutations are guarded by DashMap.
    save_lock: Mutex<()>,
}

impl<V> std::fmt::Debug for JsonStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore")
            .field("path", &self.path)
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<V> JsonStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Default,
{
    /// Create an empty store bound to `path` without touching the disk
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: DashMap::new(),
            save_lock: Mutex::new(()),
        }
    }

    /// Load the store from `path`, starting empty on any read or parse failure
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let store = Self::empty(path);
        match store.read_file().await {
            Ok(map) => {
                debug!(path = %store.path.display(), entries = map.len(), "Loaded store");
                for (key, value) in map {
                    store.entries.insert(key, value);
                }
            }
            Err(e) => {
                warn!(path = %store.path.display(), error = %e, "Could not load store, starting empty");
            }
        }
        store
    }

    async fn read_file(&self) -> Result<BTreeMap<String, V>, StoreError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value for `key`, or the default value if absent
    #[must_use]
    pub fn get(&self, key: &str) -> V {
        self.get_opt(key).unwrap_or_default()
    }

    /// Value for `key` if present
    #[must_use]
    pub fn get_opt(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    /// Read-modify-write a single entry under its shard lock, inserting the
    /// default value first if the key is absent
    pub fn update<R>(&self, key: impl Into<String>, f: impl FnOnce(&mut V) -> R) -> R {
        let mut entry = self.entries.entry(key.into()).or_default();
        f(entry.value_mut())
    }

    /// Remove `key`, returning its previous value
    pub fn delete(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain(&self, mut keep: impl FnMut(&str, &V) -> bool) {
        self.entries.retain(|key, value| keep(key, value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted copy of the current contents
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, V> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Rewrite the whole file with the current contents.
    ///
    /// Returns whether the write succeeded. Failures are logged and never
    /// propagated: the platform action that triggered the save has already
    /// happened and must still be reported to the user.
    pub async fn save(&self) -> bool {
        let _guard = self.save_lock.lock().await;
        match self.write_file().await {
            Ok(()) => true,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Could not save store");
                false
            }
        }
    }

    async fn write_file(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Fresh directory under the system temp dir for one test
    pub(crate) fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("guild-warden-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    type Store = JsonStore<HashMap<String, String>>;

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let store = Store::load(temp_dir().join("missing.json")).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let path = temp_dir().join("corrupt.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = Store::load(&path).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_get_absent_returns_default() {
        let store = Store::empty(temp_dir().join("s.json"));
        assert!(store.get("nope").is_empty());
        assert!(store.get_opt("nope").is_none());
        assert!(!store.contains("nope"));
    }

    #[tokio::test]
    async fn test_update_inserts_default_then_mutates() {
        let store = Store::empty(temp_dir().join("s.json"));
        let len = store.update("k", |map| {
            map.insert("a".into(), "b".into());
            map.len()
        });
        assert_eq!(len, 1);
        assert_eq!(store.get("k").get("a").map(String::as_str), Some("b"));
    }

    #[tokio::test]
    async fn test_save_and_reload_round_trip() {
        let dir = temp_dir();
        for count in [0usize, 1, 25] {
            let path = dir.join(format!("store-{count}.json"));
            let store = Store::empty(&path);
            for i in 0..count {
                let mut value = HashMap::new();
                value.insert("reason".to_string(), format!("spam ünïcødé 🚫 {i}"));
                store.set(format!("{i}:{}", i * 7), value);
            }
            assert!(store.save().await);

            let reloaded = Store::load(&path).await;
            assert_eq!(reloaded.snapshot(), store.snapshot());
        }
    }

    #[tokio::test]
    async fn test_save_is_pretty_printed() {
        let path = temp_dir().join("pretty.json");
        let store = Store::empty(&path);
        store.set("a", HashMap::from([("x".to_string(), "y".to_string())]));
        assert!(store.save().await);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains('\n'));
        assert!(content.contains("  \"a\""));
    }

    #[tokio::test]
    async fn test_save_failure_reports_false() {
        let dir = temp_dir();
        // A directory where the file should be makes the write fail.
        let path = dir.join("occupied");
        std::fs::create_dir_all(&path).unwrap();
        let store = Store::empty(&path);
        store.set("a", HashMap::new());
        assert!(!store.save().await);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_retain() {
        let store = Store::empty(temp_dir().join("s.json"));
        store.set("a", HashMap::new());
        store.set("b", HashMap::from([("k".to_string(), "v".to_string())]));
        assert!(store.delete("a").is_some());
        assert!(store.delete("a").is_none());
        store.retain(|_, value| !value.is_empty());
        assert_eq!(store.len(), 1);
        assert!(store.contains("b"));
    }
}
