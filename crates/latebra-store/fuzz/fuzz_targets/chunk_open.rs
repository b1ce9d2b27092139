//! Fuzz target for reading hostile backend values.
//!
//! Stores arbitrary bytes at the first metadata and data indices of a real
//! entry, then reads the entry back. Every outcome must be an error or a
//! value; nothing may panic.
//!
//! # Usage
//!
//! ```sh
//! cd crates/latebra-store
//! cargo +nightly fuzz run chunk_open -- -max_len=512
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

use latebra_crypto_core::kdf::{derive_chunk_id, derive_root, CostParameters};
use latebra_crypto_core::memory::WipeRegistry;
use latebra_crypto_core::{decrypt_block, unpad};
use latebra_store::{Backend, EntryStore, MemoryBackend};

const COST: CostParameters = CostParameters { n: 2, r: 1, p: 1 };
const BLOCK_SIZE: usize = 64;

fuzz_target!(|data: &[u8]| {
    let registry = WipeRegistry::new();

    // Raw codec path.
    if let Ok(opened) = decrypt_block(&registry, data, &[0u8; 32]) {
        if let Ok(bytes) = opened.expose() {
            let _ = unpad(&registry, &bytes);
        }
    }
    let _ = unpad(&registry, data);

    // Store path.
    let Ok(root) = derive_root(&registry, b"fuzz", b"label", &COST) else {
        return;
    };
    let backend = MemoryBackend::new();
    if let Ok(identifier) = root.identifier().expose() {
        for index in [-1i64, 0] {
            let id = derive_chunk_id(&identifier, index);
            let _ = backend.put(id.as_bytes(), data);
        }
    }
    if let Ok(store) = EntryStore::new(backend, registry.clone(), BLOCK_SIZE) {
        let _ = store.read_entry(&root);
    }
});
