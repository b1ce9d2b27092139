//! Flipping any single bit of a stored chunk must fail authentication.

use latebra_crypto_core::error::CryptoError;
use latebra_crypto_core::kdf::{derive_root, CostParameters};
use latebra_crypto_core::memory::WipeRegistry;
use latebra_crypto_core::padding::pad;
use latebra_crypto_core::symmetric::{decrypt_block, encrypt_block};

const TEST_COST: CostParameters = CostParameters { n: 4, r: 1, p: 1 };
const BLOCK_SIZE: usize = 32;

#[test]
fn every_single_bit_flip_is_detected() {
    let registry = WipeRegistry::new();
    let root = derive_root(&registry, b"yellow submarine", b"test", &TEST_COST).unwrap();
    let key = root.key().expose().unwrap().to_vec();

    let padded = pad(&registry, b"hello world", BLOCK_SIZE).unwrap();
    let sealed = encrypt_block(&padded.expose().unwrap(), &key).unwrap();

    for bit in 0..sealed.len() * 8 {
        let mut tampered = sealed.clone();
        tampered[bit / 8] ^= 1 << (bit % 8);
        let result = decrypt_block(&registry, &tampered, &key);
        assert!(
            matches!(result, Err(CryptoError::AuthenticationFailed)),
            "bit {bit} flip was not detected"
        );
    }
}

#[test]
fn truncated_or_extended_chunk_never_opens() {
    let registry = WipeRegistry::new();
    let key = [0x11u8; 32];
    let sealed = encrypt_block(&[1u8; BLOCK_SIZE], &key).unwrap();

    let truncated = &sealed[..sealed.len() - 1];
    assert!(decrypt_block(&registry, truncated, &key).is_err());

    let mut extended = sealed.clone();
    extended.push(0);
    assert!(decrypt_block(&registry, &extended, &key).is_err());
}

#[test]
fn wrong_password_key_fails_authentication() {
    let registry = WipeRegistry::new();
    let right = derive_root(&registry, b"yellow submarine", b"test", &TEST_COST).unwrap();
    let wrong = derive_root(&registry, b"yellow submarines", b"test", &TEST_COST).unwrap();

    let padded = pad(&registry, b"hello world", BLOCK_SIZE).unwrap();
    let sealed = encrypt_block(&padded.expose().unwrap(), &right.key().expose().unwrap()).unwrap();

    let result = decrypt_block(&registry, &sealed, &wrong.key().expose().unwrap());
    assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
}
