//! Store error types for `latebra-store`.

use latebra_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by a [`Backend`](crate::backend::Backend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// `put` on a key that is already occupied. The stored value is unchanged.
    #[error("key already exists")]
    AlreadyExists,

    /// Storage failure (database, filesystem).
    #[error("backend I/O error: {0}")]
    Io(String),

    /// Schema upgrade failure.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors produced by entry operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Storage layer failure.
    #[error(transparent)]
    Backend(BackendError),

    /// Rejected input (empty password or label, bad block size).
    #[error("invalid input: {0}")]
    Validation(String),

    /// An entry already occupies this password/label pair.
    #[error("entry already exists")]
    AlreadyExists,

    /// No entry for this password/label pair (or the wrong password).
    #[error("entry not found")]
    NotFound,

    /// A stored chunk does not have the configured sealed length.
    #[error("malformed chunk at index {index}: {actual} bytes (expected {expected})")]
    MalformedChunk {
        /// Chunk index within the entry (negative for metadata).
        index: i64,
        /// Configured sealed length.
        expected: usize,
        /// Length actually stored.
        actual: usize,
    },

    /// The metadata record could not be decoded.
    #[error("corrupt metadata: {0}")]
    CorruptMetadata(String),

    /// An observer stopped the operation between chunks.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::AlreadyExists => Self::AlreadyExists,
            other => Self::Backend(other),
        }
    }
}
