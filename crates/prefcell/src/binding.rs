use std::{fmt, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};

use crate::{cell::CellInner, error::CellError};

/// Owned two-way projection of a cell's entry.
///
/// A binding delegates every access to the same read/write paths as the
/// cell that created it: reads decode with default fallback, writes encode
/// with null-as-removal. It caches nothing, so it can never disagree with
/// the store, and it stays usable after the originating cell is disposed;
/// only the cell's observation ends at disposal.
pub struct Binding<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Binding<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(inner: Arc<CellInner<T>>) -> Self {
        Self { inner }
    }

    /// Decoded current value; absent or undecodable entries read as the
    /// originating cell's default.
    pub async fn get(&self) -> Result<T, CellError> {
        self.inner.read().await
    }

    /// Encodes and stores `value`; a value encoding to JSON `null` removes
    /// the entry.
    pub async fn set(&self, value: T) -> Result<(), CellError> {
        self.inner.write(value).await
    }

    /// The key this binding addresses.
    pub fn key(&self) -> &str {
        self.inner.key()
    }
}

// Manual impl: a clone shares the same inner state, `T: Clone` is not involved.
impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.inner.key())
            .finish()
    }
}
