//! Full chunk pipeline: derive → pad → seal → open → unpad.

use latebra_crypto_core::kdf::{derive_chunk_id, derive_root, CostParameters};
use latebra_crypto_core::memory::WipeRegistry;
use latebra_crypto_core::padding::{pad, unpad};
use latebra_crypto_core::symmetric::{decrypt_block, encrypt_block, sealed_len};

const TEST_COST: CostParameters = CostParameters { n: 4, r: 1, p: 1 };
const BLOCK_SIZE: usize = 64;

fn roundtrip(data: &[u8]) -> Vec<u8> {
    let registry = WipeRegistry::new();
    let root = derive_root(&registry, b"yellow submarine", b"test", &TEST_COST).unwrap();
    let key = root.key().expose().unwrap().to_vec();

    let mut out = Vec::new();
    for block in data.chunks(BLOCK_SIZE - 1) {
        let padded = pad(&registry, block, BLOCK_SIZE).unwrap();
        let sealed = encrypt_block(&padded.expose().unwrap(), &key).unwrap();
        assert_eq!(sealed.len(), sealed_len(BLOCK_SIZE));

        let opened = decrypt_block(&registry, &sealed, &key).unwrap();
        let plain = unpad(&registry, &opened.expose().unwrap()).unwrap();
        out.extend_from_slice(&plain.expose().unwrap());
    }
    out
}

#[test]
fn chunk_boundaries_roundtrip() {
    for len in [
        BLOCK_SIZE - 2,
        BLOCK_SIZE - 1,
        BLOCK_SIZE,
        BLOCK_SIZE + 1,
        10 * BLOCK_SIZE,
    ] {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        assert_eq!(roundtrip(&data), data, "length {len}");
    }
}

#[test]
fn zero_heavy_data_roundtrips() {
    let mut data = vec![0u8; BLOCK_SIZE * 2];
    data[0] = 1;
    assert_eq!(roundtrip(&data), data);
}

#[test]
fn chunk_ids_of_one_entry_are_distinct() {
    let registry = WipeRegistry::new();
    let root = derive_root(&registry, b"yellow submarine", b"test", &TEST_COST).unwrap();
    let id = root.identifier().expose().unwrap().to_vec();

    let mut ids: Vec<_> = (-16i64..16)
        .map(|i| *derive_chunk_id(&id, i).as_bytes())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 32);
}

#[test]
fn registry_is_clean_after_pipeline() {
    let registry = WipeRegistry::new();
    {
        let root = derive_root(&registry, b"pw", b"label", &TEST_COST).unwrap();
        let key = root.key().expose().unwrap().to_vec();
        let padded = pad(&registry, b"data", BLOCK_SIZE).unwrap();
        let sealed = encrypt_block(&padded.expose().unwrap(), &key).unwrap();
        let opened = decrypt_block(&registry, &sealed, &key).unwrap();
        let _plain = unpad(&registry, &opened.expose().unwrap()).unwrap();
        assert_eq!(registry.outstanding(), 5);
    }
    assert_eq!(registry.outstanding(), 0);
}
