//! `latebra-store`: Deniable entry storage for latebra.
//!
//! Splits entries into equal-size sealed chunks, stores each under an
//! unlinkable content address, and reassembles them from the password and
//! label alone. Ships an in-memory and a `SQLite` backend.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod backend;
pub mod config;
pub mod error;
pub mod metadata;
pub mod session;

pub mod entries;

pub use backend::{Backend, MemoryBackend, SqliteBackend};
pub use config::{StoreConfig, DEFAULT_BLOCK_SIZE, MIN_BLOCK_SIZE};
pub use entries::{
    ChunkProgress, EntryStore, Integrity, Phase, RemoveOutcome, RetrievedEntry, WriteSummary,
};
pub use error::{BackendError, StoreError};
pub use metadata::{EntryMetadata, METADATA_VERSION};
pub use session::Session;
