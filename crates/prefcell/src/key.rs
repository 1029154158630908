use std::{fmt, marker::PhantomData};

/// Type-safe preference key.
///
/// Pairs a storage name with its value type at compile time, so a cell for
/// a key cannot be constructed with a mismatched default or value type.
/// Keys are plain `const` items; nothing validates or registers the name,
/// and two keys sharing a name is a caller error.
///
/// # Example
/// ```rust
/// use prefcell::Key;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Clone)]
/// struct Profile {
///     display_name: String,
///     compact_mode: bool,
/// }
///
/// const PROFILE: Key<Profile> = Key::new("user_profile");
/// const LAUNCH_COUNT: Key<u32> = Key::new("launch_count");
/// ```
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<T>,
}

impl<T> Key<T> {
    /// Creates a key with the given storage name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The storage name this key addresses.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls: the derives would require `T: Clone`/`T: Copy`, but a key
// is copyable regardless of its value type.
impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("name", &self.name).finish()
    }
}
