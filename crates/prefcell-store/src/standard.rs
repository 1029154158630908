use std::sync::{Arc, LazyLock};

use crate::memory::MemoryStore;

static STANDARD: LazyLock<Arc<MemoryStore>> = LazyLock::new(|| Arc::new(MemoryStore::new()));

/// Returns the process-wide shared in-memory store.
///
/// Initialized on first use and never torn down. This is an opt-in
/// convenience for state with process scope; nothing in this workspace
/// defaults to it, and persistent state should use an explicitly opened
/// [`FileStore`](crate::FileStore) instead.
pub fn standard() -> Arc<MemoryStore> {
    Arc::clone(&STANDARD)
}
