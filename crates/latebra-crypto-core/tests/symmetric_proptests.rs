#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for ChaCha20-Poly1305 block sealing.

use latebra_crypto_core::memory::WipeRegistry;
use latebra_crypto_core::symmetric::{decrypt_block, encrypt_block, sealed_len, KEY_LEN};
use proptest::prelude::*;

/// Fixed key for property tests.
const PROP_KEY: [u8; KEY_LEN] = [0xCC; KEY_LEN];

proptest! {
    /// Seal→open always recovers the padded block.
    #[test]
    fn encrypt_decrypt_roundtrip(
        padded in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let registry = WipeRegistry::new();
        let sealed = encrypt_block(&padded, &PROP_KEY).unwrap();
        let opened = decrypt_block(&registry, &sealed, &PROP_KEY).unwrap();
        prop_assert_eq!(opened.expose().unwrap().to_vec(), padded);
    }

    /// Sealed length depends only on the block length.
    #[test]
    fn sealed_length_is_constant_per_block_size(
        a in proptest::collection::vec(any::<u8>(), 256),
        b in proptest::collection::vec(any::<u8>(), 256),
    ) {
        let sealed_a = encrypt_block(&a, &PROP_KEY).unwrap();
        let sealed_b = encrypt_block(&b, &PROP_KEY).unwrap();
        prop_assert_eq!(sealed_a.len(), sealed_len(256));
        prop_assert_eq!(sealed_b.len(), sealed_len(256));
    }
}
