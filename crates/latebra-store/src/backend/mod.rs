//! Content-addressed key/value storage consumed by the entry store.
//!
//! The store only ever needs four operations, so any storage engine that
//! can offer them is interchangeable:
//! - [`MemoryBackend`]: in-process map, for tests and short-lived use
//! - [`SqliteBackend`]: single-table `SQLite` file with secure delete

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::BackendError;

/// Opaque key/value storage with no-overwrite `put`.
///
/// Keys are derived chunk identifiers or decoy hashes; values are sealed
/// chunks. Implementations must preserve values byte for byte and must not
/// cap value size below one sealed chunk.
pub trait Backend: Send + Sync {
    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::AlreadyExists`] if `key` is occupied; the
    /// stored value is left untouched.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BackendError>;

    /// Fetch the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] on storage failure.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError>;

    /// Whether `key` is occupied.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] on storage failure.
    fn exists(&self, key: &[u8]) -> Result<bool, BackendError>;

    /// Remove `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] on storage failure.
    fn delete(&self, key: &[u8]) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BackendError> {
        (**self).put(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).get(key)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, BackendError> {
        (**self).exists(key)
    }

    fn delete(&self, key: &[u8]) -> Result<(), BackendError> {
        (**self).delete(key)
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BackendError> {
        (**self).put(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).get(key)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, BackendError> {
        (**self).exists(key)
    }

    fn delete(&self, key: &[u8]) -> Result<(), BackendError> {
        (**self).delete(key)
    }
}
