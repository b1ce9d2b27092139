//! Key derivation: one memory-hard hash per entry, one fast hash per chunk.
//!
//! This module provides:
//! - [`derive_root`]: `(master secret, label, cost)` → [`RootSecrets`]
//!   (32-byte root key + 32-byte root identifier) via scrypt
//! - [`derive_chunk_id`]: `(root identifier, index)` → [`ChunkId`] via BLAKE3
//! - [`CostParameters`]: scrypt `{N, r, p}` with `N` as a log2 exponent
//!
//! # Determinism
//!
//! Nothing here is salted or stored. The same `(master secret, label,
//! cost)` always yields the same root pair, which is the only way the store
//! finds previously written data.

use crate::error::CryptoError;
use crate::memory::{SecretBuffer, WipeRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root key length in bytes (ChaCha20-Poly1305 key).
pub const ROOT_KEY_LEN: usize = 32;

/// Root identifier length in bytes.
pub const ROOT_ID_LEN: usize = 32;

/// Derived chunk identifier length in bytes (BLAKE3 output).
pub const CHUNK_ID_LEN: usize = 32;

/// Full scrypt output, split into key and identifier halves.
const OUTPUT_LEN: usize = ROOT_KEY_LEN + ROOT_ID_LEN;

// ---------------------------------------------------------------------------
// Cost parameters
// ---------------------------------------------------------------------------

/// scrypt cost factors.
///
/// `n` is the log2 work factor: scrypt runs with `2^n` iterations. The
/// textual form is `"N,r,p"`, e.g. `"18,16,1"`.
///
/// Parameters used for a write are not recorded anywhere. Reading the entry
/// back requires supplying the same values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostParameters {
    /// log2 of the scrypt CPU/memory cost.
    pub n: u8,
    /// Block size factor.
    pub r: u32,
    /// Parallelism factor.
    pub p: u32,
}

impl Default for CostParameters {
    /// `N = 18, r = 16, p = 1` (256 Ki iterations, 512 MiB of memory).
    fn default() -> Self {
        Self { n: 18, r: 16, p: 1 }
    }
}

impl CostParameters {
    /// Check the factors without running the KDF.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Validation` if `n <= 1`, `r` or `p` is zero, or
    /// scrypt rejects the combination (e.g. `n >= 16 * r`).
    pub fn validate(&self) -> Result<(), CryptoError> {
        self.scrypt_params().map(|_| ())
    }

    fn scrypt_params(&self) -> Result<scrypt::Params, CryptoError> {
        if self.n <= 1 {
            return Err(CryptoError::Validation(format!(
                "cost factor N must be greater than 1 (got {})",
                self.n
            )));
        }
        if self.r == 0 || self.p == 0 {
            return Err(CryptoError::Validation(
                "cost factors r and p must be at least 1".into(),
            ));
        }
        scrypt::Params::new(self.n, self.r, self.p, OUTPUT_LEN).map_err(|e| {
            CryptoError::Validation(format!("cost factors {self} rejected by scrypt: {e}"))
        })
    }
}

impl fmt::Display for CostParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.n, self.r, self.p)
    }
}

impl FromStr for CostParameters {
    type Err = CryptoError;

    /// Parse `"N,r,p"` and validate the result.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [n, r, p] = parts.as_slice() else {
            return Err(CryptoError::Validation(format!(
                "cost factors must be given as N,r,p (got {s:?})"
            )));
        };
        let parse_err =
            |name: &str, value: &str| CryptoError::Validation(format!("invalid {name}: {value:?}"));
        let cost = Self {
            n: n.parse().map_err(|_| parse_err("N", n))?,
            r: r.parse().map_err(|_| parse_err("r", r))?,
            p: p.parse().map_err(|_| parse_err("p", p))?,
        };
        cost.validate()?;
        Ok(cost)
    }
}

// ---------------------------------------------------------------------------
// Root derivation
// ---------------------------------------------------------------------------

/// Per-entry secrets: the AEAD key and the addressing namespace.
///
/// Both halves live in registry-tracked [`SecretBuffer`]s.
pub struct RootSecrets {
    key: SecretBuffer,
    identifier: SecretBuffer,
}

impl RootSecrets {
    /// 32-byte encryption key for every chunk of the entry.
    #[must_use]
    pub const fn key(&self) -> &SecretBuffer {
        &self.key
    }

    /// 32-byte seed for [`derive_chunk_id`].
    #[must_use]
    pub const fn identifier(&self) -> &SecretBuffer {
        &self.identifier
    }
}

impl fmt::Debug for RootSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootSecrets(***)")
    }
}

/// Derive the root key and root identifier for one entry.
///
/// Runs scrypt over `master_secret ‖ label` with an empty salt and splits
/// the 64-byte output: the first half is the key, the second half the
/// identifier. The concatenated input and the raw output are held in
/// secret buffers and wiped on return, including on error.
///
/// # Errors
///
/// Returns `CryptoError::Validation` if `cost` is out of range (checked
/// before any hashing), or `CryptoError::KeyDerivation` if scrypt fails.
pub fn derive_root(
    registry: &WipeRegistry,
    master_secret: &[u8],
    label: &[u8],
    cost: &CostParameters,
) -> Result<RootSecrets, CryptoError> {
    let params = cost.scrypt_params()?;

    let input = registry.concat(&[master_secret, label])?;
    let mut output = registry.alloc(OUTPUT_LEN)?;
    {
        let input = input.expose()?;
        let mut out = output.expose_mut()?;
        scrypt::scrypt(&input, &[], &params, &mut out)
            .map_err(|e| CryptoError::KeyDerivation(format!("scrypt derivation failed: {e}")))?;
    }

    let out = output.expose()?;
    let (key, identifier) = out.split_at(ROOT_KEY_LEN);
    Ok(RootSecrets {
        key: registry.secret_from(key)?,
        identifier: registry.secret_from(identifier)?,
    })
}

// ---------------------------------------------------------------------------
// Chunk addressing
// ---------------------------------------------------------------------------

/// Backend key of one chunk. Uniformly distributed; reveals nothing about
/// the label or the index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId([u8; CHUNK_ID_LEN]);

impl ChunkId {
    /// Raw bytes, as handed to the backend.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CHUNK_ID_LEN] {
        &self.0
    }

    pub(crate) const fn from_hash(hash: [u8; CHUNK_ID_LEN]) -> Self {
        Self(hash)
    }
}

impl AsRef<[u8]> for ChunkId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&data_encoding::HEXLOWER.encode(&self.0))
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({self})")
    }
}

/// Derive the backend key for chunk `index` of an entry.
///
/// `BLAKE3(root_identifier ‖ index.to_le_bytes())`. The fixed-width
/// two's-complement encoding is injective over all of `i64`, so data
/// indices (`0, 1, …`) and metadata indices (`-1, -2, …`) never collide.
#[must_use]
pub fn derive_chunk_id(root_identifier: &[u8], index: i64) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(root_identifier);
    hasher.update(&index.to_le_bytes());
    ChunkId::from_hash(*hasher.finalize().as_bytes())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
