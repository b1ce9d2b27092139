//! Fuzz target for the metadata record decoder.
//!
//! Feeds arbitrary bytes to `EntryMetadata::decode`, must never panic, and
//! anything it accepts must carry a non-negative length.
//!
//! # Usage
//!
//! ```sh
//! cd crates/latebra-store
//! cargo +nightly fuzz run metadata_decode -- -max_len=4096
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(metadata) = latebra_store::EntryMetadata::decode(data) {
        assert!(metadata.length >= 0);
    }
});
