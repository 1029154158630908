use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    change::{ChangeListener, KeyChange},
    error::StoreError,
    store::PreferenceStore,
    watch::{KeyWatchers, Subscription},
};

/// In-memory preference store.
///
/// Entries live for the lifetime of the store. Suited to tests and to state
/// that should not outlive the process; see the `standard` module for the
/// process-wide shared instance.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    watchers: Arc<KeyWatchers>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            watchers: KeyWatchers::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let old = {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), value.clone())
        };

        // Notify outside the lock, and only for effective changes.
        if old.as_ref() != Some(&value) {
            self.watchers.notify(&KeyChange {
                key: key.to_string(),
                old,
                new: Some(value),
            });
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let old = {
            let mut entries = self.entries.write().await;
            entries.remove(key)
        };

        if let Some(old) = old {
            self.watchers.notify(&KeyChange {
                key: key.to_string(),
                old: Some(old),
                new: None,
            });
        }
        Ok(())
    }

    fn watch(&self, key: &str, listener: ChangeListener) -> Result<Subscription, StoreError> {
        Ok(self.watchers.subscribe(key, listener))
    }
}
