//! `latebra-crypto-core`: Cryptographic primitives for latebra.
//!
//! Key derivation, the padded block codec, decoy generation, and the
//! secure-memory registry every other layer allocates secrets through.
//! No I/O, no async.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod padding;
pub mod symmetric;

pub mod decoy;

pub use decoy::{generate_decoy, Decoy};
pub use error::CryptoError;
pub use kdf::{derive_chunk_id, derive_root, ChunkId, CostParameters, RootSecrets};
pub use memory::{
    disable_core_dumps, BufferState, SecretBuffer, SecretMut, SecretRef, WipeRegistry,
};
pub use padding::{pad, unpad};
pub use symmetric::{decrypt_block, encrypt_block, sealed_len, SealedBlock, OVERHEAD};
