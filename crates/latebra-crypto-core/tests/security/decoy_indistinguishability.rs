//! Decoys must look like real chunks and open under no derived key.

use latebra_crypto_core::decoy::generate_decoy;
use latebra_crypto_core::error::CryptoError;
use latebra_crypto_core::kdf::{derive_chunk_id, derive_root, CostParameters};
use latebra_crypto_core::memory::WipeRegistry;
use latebra_crypto_core::padding::pad;
use latebra_crypto_core::symmetric::{decrypt_block, encrypt_block};

const TEST_COST: CostParameters = CostParameters { n: 4, r: 1, p: 1 };
const BLOCK_SIZE: usize = 128;

#[test]
fn decoy_has_same_shape_as_real_chunk() {
    let registry = WipeRegistry::new();
    let root = derive_root(&registry, b"password", b"label", &TEST_COST).unwrap();
    let real_id = derive_chunk_id(&root.identifier().expose().unwrap(), 0);
    let padded = pad(&registry, b"real content", BLOCK_SIZE).unwrap();
    let real_value =
        encrypt_block(&padded.expose().unwrap(), &root.key().expose().unwrap()).unwrap();

    let decoy = generate_decoy(&registry, BLOCK_SIZE).unwrap();

    assert_eq!(decoy.key.as_bytes().len(), real_id.as_bytes().len());
    assert_eq!(decoy.value.len(), real_value.len());
}

#[test]
fn decoy_does_not_open_under_unrelated_keys() {
    let registry = WipeRegistry::new();
    let decoy = generate_decoy(&registry, BLOCK_SIZE).unwrap();

    for (password, label) in [
        (&b"yellow submarine"[..], &b"test"[..]),
        (&b"password"[..], &b"decoy"[..]),
        (&b"x"[..], &b"y"[..]),
    ] {
        let root = derive_root(&registry, password, label, &TEST_COST).unwrap();
        let result = decrypt_block(&registry, &decoy.value, &root.key().expose().unwrap());
        assert!(
            matches!(result, Err(CryptoError::AuthenticationFailed)),
            "decoy must fail authentication, not a type or length error"
        );
    }
}

#[test]
fn decoy_keys_do_not_collide_with_each_other() {
    let registry = WipeRegistry::new();
    let mut keys: Vec<_> = (0..256)
        .map(|_| *generate_decoy(&registry, 16).unwrap().key.as_bytes())
        .collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), 256);
}
