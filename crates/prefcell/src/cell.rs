//! Typed observable cells over single store entries.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use prefcell_store::{ChangeListener, KeyChange, PreferenceStore, Subscription};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{binding::Binding, error::CellError, key::Key};

type OnChangeFn<T> = dyn Fn(T, T) + Send + Sync;

/// Typed view over one entry of a preference store.
///
/// A cell pairs a key with a default value and a store handle. Reads decode
/// the raw entry to `T`, falling back to the default when the entry is
/// absent or no longer decodes. Writes encode `T`, with values encoding to
/// JSON `null` (such as `Option::None`) removing the entry instead of
/// storing a null.
///
/// A callback passed to [`with_on_change`](Self::with_on_change) observes
/// every effective transition of the entry between two stored values, no
/// matter which writer made it, as a decoded `(old, new)` pair. The cell's
/// own writes go through the store like anyone else's, so they reach the
/// callback through the same path exactly once. Observation ends when the
/// cell is dropped or explicitly [`dispose`](Self::dispose)d.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use prefcell::PrefCell;
/// use prefcell_store::MemoryStore;
///
/// # async {
/// let store = Arc::new(MemoryStore::new());
///
/// let cell = PrefCell::with_on_change("volume", store.clone(), 3u32, |old, new| {
///     println!("volume: {old} -> {new}");
/// })?;
///
/// assert_eq!(cell.get().await?, 3);
/// cell.set(11).await?;
///
/// cell.dispose();
/// # Ok::<_, prefcell::CellError>(())
/// # };
/// ```
pub struct PrefCell<T> {
    inner: Arc<CellInner<T>>,
    active: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl<T> PrefCell<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a cell without a change callback.
    pub fn new(
        key: impl Into<String>,
        store: Arc<dyn PreferenceStore>,
        default: T,
    ) -> Result<Self, CellError> {
        Self::build(key.into(), store, default, None)
    }

    /// Creates a cell whose `on_change` callback observes entry transitions.
    ///
    /// The callback runs synchronously on whatever thread the store delivers
    /// on, once per effective change, after the store already reflects the
    /// new state. It must be cheap and must not block.
    pub fn with_on_change(
        key: impl Into<String>,
        store: Arc<dyn PreferenceStore>,
        default: T,
        on_change: impl Fn(T, T) + Send + Sync + 'static,
    ) -> Result<Self, CellError> {
        Self::build(key.into(), store, default, Some(Arc::new(on_change)))
    }

    /// Creates a cell for a typed [`Key`] constant.
    pub fn for_key(
        key: Key<T>,
        store: Arc<dyn PreferenceStore>,
        default: T,
    ) -> Result<Self, CellError> {
        Self::build(key.name().to_string(), store, default, None)
    }

    fn build(
        key: String,
        store: Arc<dyn PreferenceStore>,
        default: T,
        on_change: Option<Arc<OnChangeFn<T>>>,
    ) -> Result<Self, CellError> {
        let active = Arc::new(AtomicBool::new(true));

        let listener: ChangeListener = {
            let active = Arc::clone(&active);
            let key = key.clone();
            Arc::new(move |change: &KeyChange| {
                if !active.load(Ordering::Relaxed) {
                    return;
                }
                // The store already scopes delivery; the cell never trusts that.
                if change.key != key {
                    return;
                }
                let Some(on_change) = &on_change else {
                    return;
                };
                // Creation and removal have an absent side; the callback only
                // reports transitions between two stored values.
                let (Some(old_raw), Some(new_raw)) = (&change.old, &change.new) else {
                    return;
                };
                let Some(old) = decode_notified::<T>(&key, "old", old_raw) else {
                    return;
                };
                let Some(new) = decode_notified::<T>(&key, "new", new_raw) else {
                    return;
                };
                on_change(old, new);
            })
        };

        let subscription = store.watch(&key, listener)?;

        Ok(Self {
            inner: Arc::new(CellInner {
                key,
                store,
                default,
            }),
            active,
            _subscription: subscription,
        })
    }

    /// Decoded current value of the entry.
    ///
    /// Returns the default when the entry is absent; a present entry that no
    /// longer decodes to `T` also reads as the default and is logged, not
    /// surfaced as an error.
    pub async fn get(&self) -> Result<T, CellError> {
        self.inner.read().await
    }

    /// Encodes and stores `value`.
    ///
    /// A value whose encoding is JSON `null` removes the entry instead.
    /// Writing what the store already holds changes nothing and notifies
    /// no one.
    pub async fn set(&self, value: T) -> Result<(), CellError> {
        self.inner.write(value).await
    }

    /// The key this cell addresses.
    pub fn key(&self) -> &str {
        self.inner.key()
    }

    /// Owned two-way projection of this entry.
    ///
    /// The binding shares the cell's read/write paths and holds no cached
    /// value; it stays usable after the cell is disposed.
    pub fn binding(&self) -> Binding<T> {
        Binding::new(Arc::clone(&self.inner))
    }

    /// Ends observation now instead of at drop.
    ///
    /// Consuming the cell makes a second disposal unrepresentable; writes
    /// made after this call no longer reach the callback.
    pub fn dispose(self) {
        drop(self);
    }
}

impl<T> PrefCell<Option<T>>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a cell over an optional value with a `None` default.
    ///
    /// Writing `None` removes the stored entry, so "unset" round-trips as
    /// absence rather than a stored null.
    pub fn optional(
        key: impl Into<String>,
        store: Arc<dyn PreferenceStore>,
    ) -> Result<Self, CellError> {
        Self::new(key, store, None)
    }
}

impl<T> Drop for PrefCell<T> {
    fn drop(&mut self) {
        // Flag first: a delivery already snapshotted re-checks it before
        // dispatch. The subscription then deregisters on its own drop.
        self.active.store(false, Ordering::Relaxed);
    }
}

impl<T> fmt::Debug for PrefCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefCell")
            .field("key", &self.inner.key)
            .finish()
    }
}

// Read/write half shared between a cell and the bindings it hands out.
pub(crate) struct CellInner<T> {
    key: String,
    store: Arc<dyn PreferenceStore>,
    default: T,
}

impl<T> CellInner<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub(crate) async fn read(&self) -> Result<T, CellError> {
        let raw = self.store.get(&self.key).await?;
        Ok(match raw {
            Some(value) => match serde_json::from_value(value) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(
                        "Failed to decode stored value for '{}', falling back to default: {:?}",
                        self.key, e
                    );
                    self.default.clone()
                }
            },
            None => self.default.clone(),
        })
    }

    pub(crate) async fn write(&self, value: T) -> Result<(), CellError> {
        let raw = serde_json::to_value(&value).map_err(CellError::Encode)?;
        if raw.is_null() {
            self.store.remove(&self.key).await?;
        } else {
            self.store.set(&self.key, raw).await?;
        }
        Ok(())
    }
}

impl<T> CellInner<T> {
    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

// Decode one side of a change notification. A failure drops the whole
// notification rather than surfacing an error to the callback.
fn decode_notified<T: DeserializeOwned>(key: &str, side: &str, raw: &Value) -> Option<T> {
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(
                "Dropping change notification for '{}': {} value does not decode: {:?}",
                key, side, e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use prefcell_store::{MemoryStore, StoreError};
    use serde_json::json;

    use super::*;

    // Store whose listener registration always fails; reads and writes are
    // accepted as usual.
    struct RefusingStore;

    #[async_trait]
    impl PreferenceStore for RefusingStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Ok(())
        }

        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn watch(
            &self,
            _key: &str,
            _listener: ChangeListener,
        ) -> Result<Subscription, StoreError> {
            Err(StoreError::Internal("listener registration refused".to_string()))
        }
    }

    fn recording_cell(
        store: Arc<dyn PreferenceStore>,
        key: &str,
    ) -> (PrefCell<i64>, Arc<Mutex<Vec<(i64, i64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cell = {
            let seen = seen.clone();
            PrefCell::with_on_change(key, store, 0i64, move |old, new| {
                seen.lock().unwrap().push((old, new));
            })
            .unwrap()
        };
        (cell, seen)
    }

    #[tokio::test]
    async fn test_get_falls_back_to_default_when_absent() {
        let store = Arc::new(MemoryStore::new());
        let cell = PrefCell::new("volume", store, 7i64).unwrap();

        assert_eq!(cell.get().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let cell = PrefCell::new("volume", store, 0i64).unwrap();

        cell.set(11).await.unwrap();
        assert_eq!(cell.get().await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_undecodable_entry_reads_as_default() {
        let store = Arc::new(MemoryStore::new());
        store.set("volume", json!("loud")).await.unwrap();

        let cell = PrefCell::new("volume", store.clone(), 7i64).unwrap();
        assert_eq!(cell.get().await.unwrap(), 7);

        // The undecodable entry itself is left untouched.
        assert_eq!(store.get("volume").await.unwrap(), Some(json!("loud")));
    }

    #[tokio::test]
    async fn test_default_applies_again_after_external_remove() {
        let store = Arc::new(MemoryStore::new());
        let cell = PrefCell::new("volume", store.clone(), 7i64).unwrap();

        cell.set(11).await.unwrap();
        store.remove("volume").await.unwrap();

        assert_eq!(cell.get().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_external_write_invokes_on_change_once() {
        let store = Arc::new(MemoryStore::new());
        let (_cell, seen) = recording_cell(store.clone(), "volume");

        store.set("volume", json!(5)).await.unwrap();
        store.set("volume", json!(10)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(5, 10)]);
    }

    #[tokio::test]
    async fn test_creation_and_removal_are_not_observed() {
        let store = Arc::new(MemoryStore::new());
        let (_cell, seen) = recording_cell(store.clone(), "volume");

        store.set("volume", json!(5)).await.unwrap();
        store.remove("volume").await.unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_own_writes_reach_on_change_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let (cell, seen) = recording_cell(store, "volume");

        cell.set(1).await.unwrap();
        cell.set(2).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_same_value_write_is_not_observed() {
        let store = Arc::new(MemoryStore::new());
        let (cell, seen) = recording_cell(store, "volume");

        cell.set(1).await.unwrap();
        cell.set(2).await.unwrap();
        cell.set(2).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_undecodable_side_drops_notification() {
        let store = Arc::new(MemoryStore::new());
        let (_cell, seen) = recording_cell(store.clone(), "volume");

        store.set("volume", json!(1)).await.unwrap();
        store.set("volume", json!("loud")).await.unwrap();
        store.set("volume", json!(2)).await.unwrap();

        // 1 -> "loud" fails on the new side, "loud" -> 2 on the old side.
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cross_key_writes_are_not_observed() {
        let store = Arc::new(MemoryStore::new());
        let (_cell, seen) = recording_cell(store.clone(), "volume");

        store.set("theme", json!(1)).await.unwrap();
        store.set("theme", json!(2)).await.unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispose_stops_observation() {
        let store = Arc::new(MemoryStore::new());
        let (cell, seen) = recording_cell(store.clone(), "volume");

        store.set("volume", json!(1)).await.unwrap();
        store.set("volume", json!(2)).await.unwrap();
        cell.dispose();
        store.set("volume", json!(3)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_drop_stops_observation() {
        let store = Arc::new(MemoryStore::new());
        let (cell, seen) = recording_cell(store.clone(), "volume");

        store.set("volume", json!(1)).await.unwrap();
        store.set("volume", json!(2)).await.unwrap();
        drop(cell);
        store.set("volume", json!(3)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_two_cells_on_one_key_observe_independently() {
        let store = Arc::new(MemoryStore::new());
        let (first, first_seen) = recording_cell(store.clone(), "volume");
        let (_second, second_seen) = recording_cell(store.clone(), "volume");

        store.set("volume", json!(1)).await.unwrap();
        store.set("volume", json!(2)).await.unwrap();

        first.dispose();
        store.set("volume", json!(3)).await.unwrap();

        assert_eq!(*first_seen.lock().unwrap(), vec![(1, 2)]);
        assert_eq!(*second_seen.lock().unwrap(), vec![(1, 2), (2, 3)]);
    }

    #[tokio::test]
    async fn test_optional_cell_removes_entry_on_none() {
        let store = Arc::new(MemoryStore::new());
        let cell = PrefCell::optional("nickname", store.clone()).unwrap();

        cell.set(Some("kit".to_string())).await.unwrap();
        assert_eq!(store.get("nickname").await.unwrap(), Some(json!("kit")));

        cell.set(None).await.unwrap();
        assert_eq!(store.get("nickname").await.unwrap(), None);
        assert_eq!(cell.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_for_key_addresses_the_key_name() {
        const LAUNCH_COUNT: Key<u32> = Key::new("launch_count");

        let store = Arc::new(MemoryStore::new());
        let cell = PrefCell::for_key(LAUNCH_COUNT, store.clone(), 0).unwrap();
        assert_eq!(cell.key(), "launch_count");

        cell.set(3).await.unwrap();
        assert_eq!(store.get("launch_count").await.unwrap(), Some(json!(3)));
    }

    #[test]
    fn test_failed_watch_registration_fails_construction() {
        let store: Arc<dyn PreferenceStore> = Arc::new(RefusingStore);

        let error = PrefCell::new("volume", store, 0i64).unwrap_err();
        assert!(matches!(error, CellError::Store(StoreError::Internal(_))));
    }
}
