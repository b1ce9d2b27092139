//! ChaCha20-Poly1305 sealing of single padded blocks.
//!
//! This module provides:
//! - [`encrypt_block`]: seal a padded block under a random nonce
//! - [`decrypt_block`]: authenticate and open a sealed block into a [`SecretBuffer`]
//! - [`SealedBlock`]: nonce + ciphertext + tag container
//! - [`sealed_len`]: stored size of one chunk for a given block size
//!
//! # Wire format
//!
//! `nonce (12 bytes) || ciphertext (block size) || tag (16 bytes)`. No
//! associated data. Every chunk of a given configuration has the same
//! length, so the length of a stored value says nothing about its content.

use crate::error::CryptoError;
use crate::memory::{SecretBuffer, WipeRegistry};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;

/// ChaCha20-Poly1305 nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// ChaCha20 key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Bytes added to every block by sealing.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Stored length of one chunk for `block_size`-byte padded blocks.
#[must_use]
pub const fn sealed_len(block_size: usize) -> usize {
    block_size.saturating_add(OVERHEAD)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One sealed block, split into its wire fields.
///
/// Any modification to the nonce, ciphertext, or tag causes
/// [`decrypt_block`] to fail with `AuthenticationFailed`.
#[must_use = "sealed data must be stored"]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBlock {
    /// 96-bit random nonce, unique per seal.
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted padded block.
    pub ciphertext: Vec<u8>,
    /// 128-bit authentication tag.
    pub tag: [u8; TAG_LEN],
}

impl SealedBlock {
    /// Serialize to wire format: `nonce || ciphertext || tag`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(sealed_len(self.ciphertext.len()));
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse wire format: `nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MalformedBlock` if `bytes` is shorter than
    /// [`OVERHEAD`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let ct_len = bytes
            .len()
            .checked_sub(OVERHEAD)
            .ok_or_else(|| CryptoError::MalformedBlock {
                expected: OVERHEAD,
                actual: bytes.len(),
            })?;

        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(ct_len);

        let mut sealed = Self {
            nonce: [0u8; NONCE_LEN],
            ciphertext: ciphertext.to_vec(),
            tag: [0u8; TAG_LEN],
        };
        sealed.nonce.copy_from_slice(nonce);
        sealed.tag.copy_from_slice(tag);
        Ok(sealed)
    }
}

// ---------------------------------------------------------------------------
// Core encryption
// ---------------------------------------------------------------------------

fn aead_key(key: &[u8]) -> Result<aead::LessSafeKey, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "invalid key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }
    let unbound = aead::UnboundKey::new(&aead::CHACHA20_POLY1305, key)
        .map_err(|_| CryptoError::InvalidKeyMaterial("failed to create ChaCha20 key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

/// Seal a padded block under `key` with a fresh random nonce.
///
/// Returns the wire encoding, `sealed_len(padded.len())` bytes long. The
/// nonce comes from `OsRng` on every call and is never derived from the
/// index or the content.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the key is not 32 bytes,
/// or `CryptoError::Encryption` if sealing fails.
pub fn encrypt_block(padded: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| CryptoError::Encryption(format!("nonce generation failed: {e}")))?;
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    // Sealed in place: the copy holds ciphertext once this returns.
    let mut in_out = padded.to_vec();
    let tag = key
        .seal_in_place_separate_tag(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Encryption("ChaCha20-Poly1305 seal failed".into()))?;

    let mut sealed = SealedBlock {
        nonce: nonce_bytes,
        ciphertext: in_out,
        tag: [0u8; TAG_LEN],
    };
    sealed.tag.copy_from_slice(tag.as_ref());
    Ok(sealed.to_bytes())
}

/// Open a sealed block and return the padded plaintext.
///
/// The plaintext is decrypted inside a registry-tracked buffer, so it never
/// sits in untracked memory. Wrong key and corrupted bytes fail the same
/// way.
///
/// # Errors
///
/// Returns `CryptoError::MalformedBlock` if `sealed` is shorter than
/// [`OVERHEAD`], `CryptoError::InvalidKeyMaterial` for a bad key length, and
/// `CryptoError::AuthenticationFailed` if the tag does not verify.
pub fn decrypt_block(
    registry: &WipeRegistry,
    sealed: &[u8],
    key: &[u8],
) -> Result<SecretBuffer, CryptoError> {
    let sealed = SealedBlock::from_bytes(sealed)?;
    let key = aead_key(key)?;
    let nonce = aead::Nonce::assume_unique_for_key(sealed.nonce);

    let mut work = registry.concat(&[sealed.ciphertext.as_slice(), sealed.tag.as_slice()])?;
    let plaintext_len = {
        let mut bytes = work.expose_mut()?;
        key.open_in_place(nonce, aead::Aad::empty(), &mut bytes[..])
            .map_err(|_| CryptoError::AuthenticationFailed)?
            .len()
    };

    let bytes = work.expose()?;
    registry.secret_from(&bytes[..plaintext_len])
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
