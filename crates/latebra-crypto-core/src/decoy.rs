//! Decoy chunks for plausible deniability.
//!
//! A decoy is one isolated backend record with the same key length and
//! value length as a real chunk. Its key is a hash of random bytes and its
//! value is sealed under a one-time key that is wiped before
//! [`generate_decoy`] returns, so no password/label pair can ever open it.

use crate::error::CryptoError;
use crate::kdf::ChunkId;
use crate::memory::WipeRegistry;
use crate::symmetric::{encrypt_block, KEY_LEN};
use std::fmt;

/// Random bytes drawn per decoy: one-time key, then key seed.
const SEED_LEN: usize = 64;

/// A backend record ready to be `put`. Nothing else is retained.
pub struct Decoy {
    /// Backend key, `BLAKE3` of 32 random bytes.
    pub key: ChunkId,
    /// Sealed filler block, `sealed_len(block_size)` bytes.
    pub value: Vec<u8>,
}

impl fmt::Debug for Decoy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoy")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .finish()
    }
}

/// Generate one decoy chunk for the given block size.
///
/// Draws 64 random bytes: the first 32 seal an all-zero block, the hash of
/// the last 32 becomes the backend key. Successive decoys share nothing.
///
/// # Errors
///
/// Returns `CryptoError::Validation` for a zero block size, or a
/// `SecureMemory`/`Encryption` error from the CSPRNG or the AEAD.
pub fn generate_decoy(registry: &WipeRegistry, block_size: usize) -> Result<Decoy, CryptoError> {
    if block_size == 0 {
        return Err(CryptoError::Validation("block size must be positive".into()));
    }

    let seed = registry.random(SEED_LEN)?;
    let seed = seed.expose()?;
    let (one_time_key, key_seed) = seed.split_at(KEY_LEN);

    let key = ChunkId::from_hash(*blake3::hash(key_seed).as_bytes());
    let value = encrypt_block(&vec![0u8; block_size], one_time_key)?;
    Ok(Decoy { key, value })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
