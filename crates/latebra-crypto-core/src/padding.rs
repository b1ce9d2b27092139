//! Terminator padding to a fixed block size.
//!
//! `pad` appends one `0x01` byte and zero-fills to the target size;
//! `unpad` strips trailing zeros, then requires and strips exactly one
//! `0x01`. Unpadding never needs the original length, so a plaintext that
//! itself ends in zero bytes survives the round trip.

use crate::error::CryptoError;
use crate::memory::{SecretBuffer, WipeRegistry};

/// Padding terminator byte.
const TERMINATOR: u8 = 0x01;

/// Pad `block` to exactly `target` bytes.
///
/// A block of `target - 1` bytes gets the terminator and no zero fill.
///
/// # Errors
///
/// Returns `CryptoError::BlockTooLarge` if `block.len() >= target` (no room
/// for the terminator).
pub fn pad(
    registry: &WipeRegistry,
    block: &[u8],
    target: usize,
) -> Result<SecretBuffer, CryptoError> {
    if block.len() >= target {
        return Err(CryptoError::BlockTooLarge {
            len: block.len(),
            max: target.saturating_sub(1),
        });
    }

    let mut padded = registry.alloc(target)?;
    {
        let mut bytes = padded.expose_mut()?;
        bytes[..block.len()].copy_from_slice(block);
        bytes[block.len()] = TERMINATOR;
    }
    Ok(padded)
}

/// Remove terminator padding.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPadding` if the last non-zero byte is not
/// `0x01`, or if the block contains no non-zero byte at all.
pub fn unpad(registry: &WipeRegistry, padded: &[u8]) -> Result<SecretBuffer, CryptoError> {
    match padded.iter().rposition(|&b| b != 0) {
        Some(end) if padded[end] == TERMINATOR => registry.secret_from(&padded[..end]),
        _ => Err(CryptoError::InvalidPadding),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
