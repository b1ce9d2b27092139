use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::Backend;
use crate::error::BackendError;

/// In-memory [`Backend`] over a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    chunks: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the map lock is poisoned.
    pub fn len(&self) -> Result<usize, BackendError> {
        Ok(self.lock()?.len())
    }

    /// Whether no chunk is stored.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the map lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, BackendError> {
        Ok(self.lock()?.is_empty())
    }

    /// Copies of every stored value, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the map lock is poisoned.
    pub fn values(&self) -> Result<Vec<Vec<u8>>, BackendError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Vec<u8>, Vec<u8>>>, BackendError> {
        self.chunks
            .lock()
            .map_err(|_| BackendError::Io("memory backend lock poisoned".into()))
    }
}

impl Backend for MemoryBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BackendError> {
        let mut chunks = self.lock()?;
        if chunks.contains_key(key) {
            return Err(BackendError::AlreadyExists);
        }
        chunks.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, BackendError> {
        Ok(self.lock()?.contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<(), BackendError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
