use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, Weak,
    },
};

use crate::change::{ChangeListener, KeyChange};

/// Registry of per-key change listeners shared by a store backend.
///
/// Backends hold one registry, register listeners through
/// [`subscribe`](Self::subscribe) and fan changes out through
/// [`notify`](Self::notify). The registry itself does no key bookkeeping
/// beyond filtering at delivery time; listeners for distinct keys coexist in
/// the same map.
pub struct KeyWatchers {
    // BTreeMap keyed by a monotonic id keeps delivery in registration order.
    entries: RwLock<BTreeMap<u64, WatcherEntry>>,
    next_id: AtomicU64,
}

struct WatcherEntry {
    key: String,
    listener: ChangeListener,
}

impl KeyWatchers {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Registers `listener` for changes to `key`.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped. Multiple listeners may watch the same key.
    pub fn subscribe(
        self: &Arc<Self>,
        key: impl Into<String>,
        listener: ChangeListener,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .expect("RwLock should not be poisoned")
            .insert(
                id,
                WatcherEntry {
                    key: key.into(),
                    listener,
                },
            );
        Subscription {
            watchers: Arc::downgrade(self),
            id,
        }
    }

    /// Delivers `change` to every listener registered for `change.key`.
    ///
    /// The listener set is snapshotted under the registry lock and invoked
    /// after the lock is released, so listeners may re-enter the registry.
    /// A listener registered while a delivery is in flight does not receive
    /// that delivery; one deregistered mid-delivery still may.
    pub fn notify(&self, change: &KeyChange) {
        let listeners: Vec<ChangeListener> = {
            let entries = self.entries.read().expect("RwLock should not be poisoned");
            entries
                .values()
                .filter(|entry| entry.key == change.key)
                .map(|entry| Arc::clone(&entry.listener))
                .collect()
        };

        for listener in listeners {
            listener(change);
        }
    }

    /// Number of currently registered listeners, across all keys.
    pub fn watcher_count(&self) -> usize {
        self.entries
            .read()
            .expect("RwLock should not be poisoned")
            .len()
    }

    fn remove(&self, id: u64) {
        self.entries
            .write()
            .expect("RwLock should not be poisoned")
            .remove(&id);
    }
}

impl fmt::Debug for KeyWatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyWatchers")
            .field("watchers", &self.watcher_count())
            .finish()
    }
}

/// Guard for one listener registration.
///
/// Dropping the guard deregisters the listener. Dropping it after the
/// registry itself is gone is a no-op.
#[must_use = "the listener is deregistered as soon as the subscription is dropped"]
pub struct Subscription {
    watchers: Weak<KeyWatchers>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(watchers) = self.watchers.upgrade() {
            watchers.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
