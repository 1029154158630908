use async_trait::async_trait;
use serde_json::Value;

use crate::{change::ChangeListener, error::StoreError, watch::Subscription};

/// Contract implemented by preference store backends.
///
/// A store is a string-keyed map of raw JSON values with per-key change
/// notification. Implementations must uphold the notification contract:
///
/// - Only effective changes are delivered. Writing a value equal to the one
///   already stored, or removing an absent key, delivers nothing.
/// - Each effective change is delivered at most once per registered
///   listener, with the raw `(old, new)` pair as observed by that change.
/// - Delivery happens after the store's own state reflects the change, so a
///   listener reading the store sees the new state.
///
/// The bundled backends deliver synchronously on the writing task's thread.
/// Interleaving across concurrent writers follows scheduling; per key, the
/// delivered pairs always chain the actual sequence of states.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Returns the raw entry stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes the entry under `key`. Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Registers `listener` for changes to `key`.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped. Keys are not validated; a key nothing writes to simply never
    /// delivers.
    fn watch(&self, key: &str, listener: ChangeListener) -> Result<Subscription, StoreError>;
}
