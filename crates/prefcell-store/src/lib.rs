#![doc = include_str!("../README.md")]

/// Change records and the listener callback type delivered to watchers.
pub mod change;

/// Store error types.
pub mod error;

/// JSON-file-backed store.
pub mod file;

/// In-memory store.
pub mod memory;

/// Process-wide shared store.
pub mod standard;

/// The contract implemented by store backends.
pub mod store;

/// Per-key listener registry and subscription guards.
pub mod watch;

pub use change::{ChangeListener, KeyChange};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use standard::standard;
pub use store::PreferenceStore;
pub use watch::{KeyWatchers, Subscription};
