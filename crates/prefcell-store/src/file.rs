use std::{
    collections::HashMap,
    fmt,
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    change::{ChangeListener, KeyChange},
    error::StoreError,
    store::PreferenceStore,
    watch::{KeyWatchers, Subscription},
};

/// Preference store persisted as a single JSON object file.
///
/// The whole map is read once at open and held in memory; every effective
/// write rewrites the file before the change is committed or delivered, so a
/// failed write leaves both the file and the observable state untouched.
///
/// One instance owns its path. Concurrent instances over the same file race
/// on it, and change notifications cover writes made through this instance
/// only.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, Value>>,
    watchers: Arc<KeyWatchers>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// A missing file starts the store empty; it is created on the first
    /// write. A file that exists but does not parse as a JSON object is an
    /// error, not an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            watchers: KeyWatchers::new(),
        })
    }

    // Rewrites the full map through a sibling temp file; the rename keeps a
    // crash mid-write from truncating the previous contents.
    fn persist(&self, entries: &HashMap<String, Value>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        // `.tmp` goes after the full name (`data.json` -> `data.json.tmp`):
        // stores named `data.json` and `data.cfg` must not share a temp path.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

#[async_trait]
impl PreferenceStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let change = {
            let mut entries = self.entries.lock().await;
            if entries.get(key) == Some(&value) {
                return Ok(());
            }

            let mut next = entries.clone();
            let old = next.insert(key.to_string(), value.clone());
            self.persist(&next)?;
            *entries = next;

            KeyChange {
                key: key.to_string(),
                old,
                new: Some(value),
            }
        };

        self.watchers.notify(&change);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let change = {
            let mut entries = self.entries.lock().await;
            if !entries.contains_key(key) {
                return Ok(());
            }

            let mut next = entries.clone();
            let old = next.remove(key);
            self.persist(&next)?;
            *entries = next;

            KeyChange {
                key: key.to_string(),
                old,
                new: None,
            }
        };

        self.watchers.notify(&change);
        Ok(())
    }

    fn watch(&self, key: &str, listener: ChangeListener) -> Result<Subscription, StoreError> {
        Ok(self.watchers.subscribe(key, listener))
    }
}
