//! BLAKE3 reference vector and the chunk-id input layout.

use latebra_crypto_core::kdf::derive_chunk_id;

/// BLAKE3 of the empty input (official test vectors).
const BLAKE3_EMPTY: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

#[test]
fn blake3_empty_input() {
    assert_eq!(blake3::hash(b"").to_hex().as_str(), BLAKE3_EMPTY);
}

#[test]
fn chunk_id_hashes_identifier_then_little_endian_index() {
    let root_id = [0xABu8; 32];
    for index in [0i64, 1, -1, 255, 256, i64::MIN, i64::MAX] {
        let mut input = root_id.to_vec();
        input.extend_from_slice(&index.to_le_bytes());
        assert_eq!(
            derive_chunk_id(&root_id, index).to_string(),
            blake3::hash(&input).to_hex().as_str(),
            "index {index}"
        );
    }
}
