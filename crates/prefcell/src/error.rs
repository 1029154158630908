use prefcell_store::StoreError;
use thiserror::Error;

/// Errors surfaced by typed cells.
///
/// Decoding is not represented here: a stored value that no longer decodes
/// to the cell's type falls back to the default on reads and drops the
/// change notification, it does not fail the call.
#[derive(Debug, Error)]
pub enum CellError {
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The value could not be encoded for storage.
    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
}
