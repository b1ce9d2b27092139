//! Cryptographic error types for `latebra-crypto-core`.

use thiserror::Error;

/// Errors produced by derivation, codec, and secure memory operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Rejected input, detected before any cryptographic work is done
    /// (bad cost factors, wrong block geometry).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The memory-hard KDF failed after its parameters were accepted.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// AEAD sealing failure.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// AEAD open failed. Wrong key and corrupted ciphertext are
    /// deliberately indistinguishable.
    #[error("decryption failed: authentication tag mismatch")]
    AuthenticationFailed,

    /// Decryption succeeded but the block did not end in `1 0*`.
    #[error("invalid padding")]
    InvalidPadding,

    /// Plaintext block leaves no room for the padding terminator.
    #[error("block of {len} bytes does not fit (maximum {max})")]
    BlockTooLarge {
        /// Length of the rejected block.
        len: usize,
        /// Largest block that can be padded to the target size.
        max: usize,
    },

    /// A sealed block whose length is not the configured constant.
    #[error("malformed sealed block: {actual} bytes (expected {expected})")]
    MalformedBlock {
        /// Length every sealed block must have.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },

    /// Invalid key material (wrong length).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Secure memory failure (CSPRNG, poisoned buffer lock).
    #[error("secure memory error: {0}")]
    SecureMemory(String),

    /// The buffer was wiped (shutdown purge or explicit wipe) and can no
    /// longer be read.
    #[error("secret buffer has been wiped")]
    BufferWiped,
}
