//! Per-entry metadata record, stored at negative chunk indices.
//!
//! The backend has no length or listing primitive, so each entry carries
//! its declared plaintext length. The record is JSON, sealed and chunked
//! exactly like data.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Current metadata schema version.
pub const METADATA_VERSION: u32 = 1;

/// Metadata for one entry.
///
/// Wire form: `{"version":1,"length":<bytes>}`. A record without
/// `version` (`{"length": n}`) decodes as version 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Total plaintext length in bytes.
    pub length: i64,
}

const fn default_version() -> u32 {
    METADATA_VERSION
}

impl EntryMetadata {
    /// Metadata for a plaintext of `length` bytes.
    #[must_use]
    pub const fn new(length: i64) -> Self {
        Self {
            version: METADATA_VERSION,
            length,
        }
    }

    /// Encode to the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptMetadata`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(self).map_err(|e| StoreError::CorruptMetadata(e.to_string()))
    }

    /// Decode and check a metadata record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptMetadata`] for malformed JSON, a
    /// missing `length`, a negative length, or a newer schema version.
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let meta: Self =
            serde_json::from_slice(bytes).map_err(|e| StoreError::CorruptMetadata(e.to_string()))?;
        if meta.version > METADATA_VERSION {
            return Err(StoreError::CorruptMetadata(format!(
                "unsupported metadata version {}",
                meta.version
            )));
        }
        if meta.length < 0 {
            return Err(StoreError::CorruptMetadata(format!(
                "negative length {}",
                meta.length
            )));
        }
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_snapshot() {
        insta::assert_json_snapshot!(EntryMetadata::new(11), @r###"
        {
          "version": 1,
          "length": 11
        }
        "###);
    }

    #[test]
    fn encode_is_compact_json() {
        let bytes = EntryMetadata::new(4096).encode().unwrap();
        assert_eq!(bytes, br#"{"version":1,"length":4096}"#);
    }

    #[test]
    fn decode_roundtrip() {
        let meta = EntryMetadata::new(123_456);
        let decoded = EntryMetadata::decode(&meta.encode().unwrap()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn decode_accepts_unversioned_record() {
        let meta = EntryMetadata::decode(br#"{"length": 11}"#).unwrap();
        assert_eq!(meta, EntryMetadata::new(11));
    }

    #[test]
    fn decode_rejects_missing_length() {
        assert!(matches!(
            EntryMetadata::decode(br#"{"version": 1}"#),
            Err(StoreError::CorruptMetadata(_))
        ));
    }

    #[test]
    fn decode_rejects_garbage_negative_and_future() {
        for bad in [
            &b"not json"[..],
            br#"{"length": -1}"#,
            br#"{"version": 2, "length": 1}"#,
            br#"{"length": "11"}"#,
        ] {
            assert!(
                matches!(EntryMetadata::decode(bad), Err(StoreError::CorruptMetadata(_))),
                "{:?} should be rejected",
                String::from_utf8_lossy(bad)
            );
        }
    }
}
