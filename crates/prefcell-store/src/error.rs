use thiserror::Error;

/// Errors surfaced by preference store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted payload could not be parsed or serialized as JSON.
    #[error("Store payload is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),

    /// Backend failure with no more precise variant.
    #[error("Internal store error: {0}")]
    Internal(String),
}
