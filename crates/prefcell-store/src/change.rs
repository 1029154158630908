use std::sync::Arc;

use serde_json::Value;

/// A single observed change to one store entry.
///
/// Both sides carry the raw stored representation. An absent side means the
/// entry did not exist on that side of the change: `old: None` records a
/// creation, `new: None` a removal. Stores never emit a change where both
/// sides are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChange {
    /// Key whose entry changed.
    pub key: String,
    /// Raw value before the change, or `None` when the entry did not exist.
    pub old: Option<Value>,
    /// Raw value after the change, or `None` when the entry was removed.
    pub new: Option<Value>,
}

/// Callback invoked by a store when a watched entry changes.
///
/// Bundled backends invoke listeners synchronously on the writing task's
/// thread, after the store's own state reflects the change and with no store
/// locks held. Listeners must be cheap and must not block; anything heavier
/// should be handed off to a task.
pub type ChangeListener = Arc<dyn Fn(&KeyChange) + Send + Sync>;
