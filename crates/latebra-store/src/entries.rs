//! Whole-entry write, read, and delete over a [`Backend`].
//!
//! An entry is never materialized as one record. Data block `n` lives at
//! `derive_chunk_id(root_identifier, n)` for `n = 0, 1, …`; the metadata
//! record is chunked the same way at `n = -1, -2, …`. Walking stops at the
//! first absent index.
//!
//! Writes and deletes are not transactional: a failure or cancellation
//! part-way leaves the chunks already processed in place.

use std::fmt;
use std::ops::ControlFlow;

use latebra_crypto_core::decoy::generate_decoy;
use latebra_crypto_core::kdf::{derive_chunk_id, ChunkId, RootSecrets};
use latebra_crypto_core::memory::{SecretBuffer, WipeRegistry};
use latebra_crypto_core::padding::{pad, unpad};
use latebra_crypto_core::symmetric::{decrypt_block, encrypt_block, sealed_len};
use zeroize::Zeroize;

use crate::backend::Backend;
use crate::config::MIN_BLOCK_SIZE;
use crate::error::StoreError;
use crate::metadata::EntryMetadata;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which chunk sequence an operation is walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Metadata chunks at negative indices.
    Metadata,
    /// Data chunks at non-negative indices.
    Data,
    /// Standalone decoy chunks.
    Decoys,
}

/// Reported to an observer after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Sequence being processed.
    pub phase: Phase,
    /// Chunks finished in this phase so far.
    pub completed: usize,
    /// Chunks expected in this phase, when known up front.
    pub total: Option<usize>,
}

/// Result of comparing recovered data against the declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    /// Recovered length matches the metadata.
    Complete,
    /// Recovered length differs from the metadata. Usually a lost chunk:
    /// a missing index ends the walk, so everything after it is dropped.
    Incomplete {
        /// Length recorded when the entry was written.
        declared: i64,
        /// Bytes actually recovered.
        recovered: usize,
    },
}

/// Plaintext of one entry plus its integrity verdict.
#[derive(Debug)]
pub struct RetrievedEntry {
    /// Reassembled plaintext.
    pub data: SecretBuffer,
    /// Whether the length matched the metadata.
    pub integrity: Integrity,
}

impl RetrievedEntry {
    /// `true` if the recovered length matches the declared one.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.integrity, Integrity::Complete)
    }
}

/// Chunks written for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Chunks at negative indices.
    pub metadata_chunks: usize,
    /// Chunks at non-negative indices.
    pub data_chunks: usize,
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// At least one chunk was deleted.
    Removed {
        /// Metadata and data chunks deleted.
        chunks: usize,
    },
    /// No chunk existed for this entry.
    NothingToRemove,
}

fn keep_going(_: &ChunkProgress) -> ControlFlow<()> {
    ControlFlow::Continue(())
}

fn notify<F>(observer: &mut F, progress: ChunkProgress) -> Result<(), StoreError>
where
    F: FnMut(&ChunkProgress) -> ControlFlow<()>,
{
    match observer(&progress) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(StoreError::Cancelled),
    }
}

/// Chunk index of the `position`-th block of a sequence.
///
/// Data block `k` is at index `k`; metadata block `k` is at `-1 - k`.
fn chunk_index(phase: Phase, position: usize) -> Result<i64, StoreError> {
    let position = i64::try_from(position).ok();
    let index = match phase {
        Phase::Metadata => position.and_then(|p| (-1i64).checked_sub(p)),
        Phase::Data | Phase::Decoys => position,
    };
    index.ok_or_else(|| StoreError::Validation("entry has too many chunks".into()))
}

fn chunk_id(identifier: &SecretBuffer, index: i64) -> Result<ChunkId, StoreError> {
    let identifier = identifier.expose()?;
    Ok(derive_chunk_id(&identifier, index))
}

// ---------------------------------------------------------------------------
// EntryStore
// ---------------------------------------------------------------------------

/// Entry lifecycle on top of a content-addressed backend.
///
/// Every `*_with` method takes an observer that is called after each chunk;
/// returning `ControlFlow::Break(())` stops the operation with
/// [`StoreError::Cancelled`] (also after the final chunk). Chunks already
/// processed are left as they are.
pub struct EntryStore<B> {
    backend: B,
    registry: WipeRegistry,
    block_size: usize,
}

impl<B> fmt::Debug for EntryStore<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStore")
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> EntryStore<B> {
    /// Build a store over `backend` with the given padded block size.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if `block_size` is below
    /// [`MIN_BLOCK_SIZE`].
    pub fn new(backend: B, registry: WipeRegistry, block_size: usize) -> Result<Self, StoreError> {
        if block_size < MIN_BLOCK_SIZE {
            return Err(StoreError::Validation(format!(
                "block size must be at least {MIN_BLOCK_SIZE} (got {block_size})"
            )));
        }
        Ok(Self {
            backend,
            registry,
            block_size,
        })
    }

    /// The underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Padded block size.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Exact length of every stored chunk.
    #[must_use]
    pub const fn chunk_len(&self) -> usize {
        sealed_len(self.block_size)
    }

    /// Plaintext bytes carried per chunk.
    const fn payload_len(&self) -> usize {
        self.block_size.saturating_sub(1)
    }

    // -----------------------------------------------------------------------
    // Session-level API
    // -----------------------------------------------------------------------

    /// Store `data` under `label`.
    ///
    /// # Errors
    ///
    /// See [`write_entry_with`](Self::write_entry_with); also
    /// [`StoreError::Validation`] for an empty label.
    pub fn add(
        &self,
        session: &Session,
        label: &[u8],
        data: &[u8],
    ) -> Result<WriteSummary, StoreError> {
        self.add_with(session, label, data, keep_going)
    }

    /// [`add`](Self::add) with a progress observer.
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn add_with<F>(
        &self,
        session: &Session,
        label: &[u8],
        data: &[u8],
        observer: F,
    ) -> Result<WriteSummary, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let root = session.derive_entry(label)?;
        self.write_entry_with(&root, data, observer)
    }

    /// Fetch the entry stored under `label`.
    ///
    /// # Errors
    ///
    /// See [`read_entry_with`](Self::read_entry_with).
    pub fn retrieve(&self, session: &Session, label: &[u8]) -> Result<RetrievedEntry, StoreError> {
        self.retrieve_with(session, label, keep_going)
    }

    /// [`retrieve`](Self::retrieve) with a progress observer.
    ///
    /// # Errors
    ///
    /// See [`read_entry_with`](Self::read_entry_with).
    pub fn retrieve_with<F>(
        &self,
        session: &Session,
        label: &[u8],
        observer: F,
    ) -> Result<RetrievedEntry, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let root = session.derive_entry(label)?;
        self.read_entry_with(&root, observer)
    }

    /// Delete the entry stored under `label`.
    ///
    /// # Errors
    ///
    /// See [`delete_entry_with`](Self::delete_entry_with).
    pub fn remove(&self, session: &Session, label: &[u8]) -> Result<RemoveOutcome, StoreError> {
        self.remove_with(session, label, keep_going)
    }

    /// [`remove`](Self::remove) with a progress observer.
    ///
    /// # Errors
    ///
    /// See [`delete_entry_with`](Self::delete_entry_with).
    pub fn remove_with<F>(
        &self,
        session: &Session,
        label: &[u8],
        observer: F,
    ) -> Result<RemoveOutcome, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let root = session.derive_entry(label)?;
        self.delete_entry_with(root.identifier(), observer)
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Write a new entry under already-derived root secrets.
    ///
    /// # Errors
    ///
    /// See [`write_entry_with`](Self::write_entry_with).
    pub fn write_entry(&self, root: &RootSecrets, data: &[u8]) -> Result<WriteSummary, StoreError> {
        self.write_entry_with(root, data, keep_going)
    }

    /// Write a new entry: metadata at `-1, -2, …`, then data at `0, 1, …`.
    ///
    /// Empty data is stored as one chunk holding zero bytes.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyExists`] if index `0` or `-1` is occupied
    ///   (nothing is written).
    /// - [`StoreError::Backend`] if a `put` fails; earlier chunks stay.
    /// - [`StoreError::Cancelled`] if the observer breaks.
    pub fn write_entry_with<F>(
        &self,
        root: &RootSecrets,
        data: &[u8],
        mut observer: F,
    ) -> Result<WriteSummary, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let length = i64::try_from(data.len())
            .map_err(|_| StoreError::Validation("data too large".into()))?;

        let identifier = root.identifier();
        if self.occupied(identifier, 0)? || self.occupied(identifier, -1)? {
            return Err(StoreError::AlreadyExists);
        }

        let mut metadata = EntryMetadata::new(length).encode()?;
        let written = self.write_blocks(root, Phase::Metadata, &metadata, &mut observer);
        metadata.zeroize();
        let metadata_chunks = written?;

        let data_chunks = self.write_blocks(root, Phase::Data, data, &mut observer)?;

        tracing::debug!(metadata_chunks, data_chunks, "entry written");
        Ok(WriteSummary {
            metadata_chunks,
            data_chunks,
        })
    }

    fn write_blocks<F>(
        &self,
        root: &RootSecrets,
        phase: Phase,
        payload: &[u8],
        observer: &mut F,
    ) -> Result<usize, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let blocks: Vec<&[u8]> = if payload.is_empty() {
            vec![payload]
        } else {
            payload.chunks(self.payload_len()).collect()
        };
        let total = blocks.len();

        for (position, block) in blocks.into_iter().enumerate() {
            let id = chunk_id(root.identifier(), chunk_index(phase, position)?)?;
            let sealed = self.seal(root, block)?;
            self.backend.put(id.as_bytes(), &sealed)?;
            notify(
                observer,
                ChunkProgress {
                    phase,
                    completed: position.saturating_add(1),
                    total: Some(total),
                },
            )?;
        }
        Ok(total)
    }

    fn seal(&self, root: &RootSecrets, block: &[u8]) -> Result<Vec<u8>, StoreError> {
        let padded = pad(&self.registry, block, self.block_size)?;
        let padded = padded.expose()?;
        let key = root.key().expose()?;
        Ok(encrypt_block(&padded, &key)?)
    }

    fn occupied(&self, identifier: &SecretBuffer, index: i64) -> Result<bool, StoreError> {
        let id = chunk_id(identifier, index)?;
        Ok(self.backend.exists(id.as_bytes())?)
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Read an entry under already-derived root secrets.
    ///
    /// # Errors
    ///
    /// See [`read_entry_with`](Self::read_entry_with).
    pub fn read_entry(&self, root: &RootSecrets) -> Result<RetrievedEntry, StoreError> {
        self.read_entry_with(root, keep_going)
    }

    /// Read the metadata, then the data, then compare lengths.
    ///
    /// A length mismatch is not an error: the entry comes back with
    /// [`Integrity::Incomplete`] and a warning is logged.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if there is no metadata chunk (no entry,
    ///   or the wrong password/label/cost).
    /// - [`StoreError::MalformedChunk`] for a chunk of the wrong length.
    /// - [`StoreError::Crypto`] with `AuthenticationFailed` or
    ///   `InvalidPadding` for a chunk that does not open cleanly.
    /// - [`StoreError::CorruptMetadata`] if the record does not decode.
    /// - [`StoreError::Cancelled`] if the observer breaks.
    pub fn read_entry_with<F>(
        &self,
        root: &RootSecrets,
        mut observer: F,
    ) -> Result<RetrievedEntry, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let metadata_parts = self.read_blocks(root, Phase::Metadata, None, &mut observer)?;
        if metadata_parts.is_empty() {
            return Err(StoreError::NotFound);
        }
        let metadata = {
            let joined = self.join(&metadata_parts)?;
            let bytes = joined.expose()?;
            EntryMetadata::decode(&bytes)?
        };

        let expected = self.expected_chunks(metadata.length);
        let data_parts = self.read_blocks(root, Phase::Data, Some(expected), &mut observer)?;
        let data = self.join(&data_parts)?;

        let integrity = if i64::try_from(data.len()).ok() == Some(metadata.length) {
            Integrity::Complete
        } else {
            tracing::warn!(
                declared = metadata.length,
                recovered = data.len(),
                "entry data incomplete"
            );
            Integrity::Incomplete {
                declared: metadata.length,
                recovered: data.len(),
            }
        };

        tracing::debug!(
            metadata_chunks = metadata_parts.len(),
            data_chunks = data_parts.len(),
            "entry read"
        );
        Ok(RetrievedEntry { data, integrity })
    }

    fn read_blocks<F>(
        &self,
        root: &RootSecrets,
        phase: Phase,
        total: Option<usize>,
        observer: &mut F,
    ) -> Result<Vec<SecretBuffer>, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let mut parts = Vec::new();
        loop {
            let index = chunk_index(phase, parts.len())?;
            let id = chunk_id(root.identifier(), index)?;
            let Some(sealed) = self.backend.get(id.as_bytes())? else {
                break;
            };
            parts.push(self.open(root, index, &sealed)?);
            notify(
                observer,
                ChunkProgress {
                    phase,
                    completed: parts.len(),
                    total,
                },
            )?;
        }
        Ok(parts)
    }

    fn open(
        &self,
        root: &RootSecrets,
        index: i64,
        sealed: &[u8],
    ) -> Result<SecretBuffer, StoreError> {
        let expected = self.chunk_len();
        if sealed.len() != expected {
            return Err(StoreError::MalformedChunk {
                index,
                expected,
                actual: sealed.len(),
            });
        }
        let padded = {
            let key = root.key().expose()?;
            decrypt_block(&self.registry, sealed, &key)?
        };
        let padded = padded.expose()?;
        Ok(unpad(&self.registry, &padded)?)
    }

    fn join(&self, parts: &[SecretBuffer]) -> Result<SecretBuffer, StoreError> {
        let guards = parts
            .iter()
            .map(SecretBuffer::expose)
            .collect::<Result<Vec<_>, _>>()?;
        let slices: Vec<&[u8]> = guards.iter().map(|guard| &**guard).collect();
        Ok(self.registry.concat(&slices)?)
    }

    /// Data chunks an entry of `length` bytes was written with.
    fn expected_chunks(&self, length: i64) -> usize {
        let length = usize::try_from(length).unwrap_or(0);
        length.div_ceil(self.payload_len()).max(1)
    }

    // -----------------------------------------------------------------------
    // Delete path
    // -----------------------------------------------------------------------

    /// Delete an entry given only its root identifier.
    ///
    /// # Errors
    ///
    /// See [`delete_entry_with`](Self::delete_entry_with).
    pub fn delete_entry(
        &self,
        root_identifier: &SecretBuffer,
    ) -> Result<RemoveOutcome, StoreError> {
        self.delete_entry_with(root_identifier, keep_going)
    }

    /// Delete metadata at `-1, -2, …` until absent, then data at `0, 1, …`
    /// until absent. The root key is not needed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Backend`] if an existence check or delete fails;
    ///   chunks already deleted stay deleted.
    /// - [`StoreError::Cancelled`] if the observer breaks.
    pub fn delete_entry_with<F>(
        &self,
        root_identifier: &SecretBuffer,
        mut observer: F,
    ) -> Result<RemoveOutcome, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let metadata = self.delete_blocks(root_identifier, Phase::Metadata, &mut observer)?;
        let data = self.delete_blocks(root_identifier, Phase::Data, &mut observer)?;
        let chunks = metadata.saturating_add(data);

        tracing::debug!(metadata_chunks = metadata, data_chunks = data, "entry deleted");
        if chunks == 0 {
            Ok(RemoveOutcome::NothingToRemove)
        } else {
            Ok(RemoveOutcome::Removed { chunks })
        }
    }

    fn delete_blocks<F>(
        &self,
        identifier: &SecretBuffer,
        phase: Phase,
        observer: &mut F,
    ) -> Result<usize, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        let mut deleted = 0usize;
        loop {
            let id = chunk_id(identifier, chunk_index(phase, deleted)?)?;
            if !self.backend.exists(id.as_bytes())? {
                break;
            }
            self.backend.delete(id.as_bytes())?;
            deleted = deleted.saturating_add(1);
            notify(
                observer,
                ChunkProgress {
                    phase,
                    completed: deleted,
                    total: None,
                },
            )?;
        }
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Decoys
    // -----------------------------------------------------------------------

    /// Insert `count` decoy chunks.
    ///
    /// # Errors
    ///
    /// See [`insert_decoys_with`](Self::insert_decoys_with).
    pub fn insert_decoys(&self, count: usize) -> Result<usize, StoreError> {
        self.insert_decoys_with(count, keep_going)
    }

    /// Insert `count` decoy chunks directly through the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a `put` fails and
    /// [`StoreError::Cancelled`] if the observer breaks. Decoys already
    /// inserted stay.
    pub fn insert_decoys_with<F>(&self, count: usize, mut observer: F) -> Result<usize, StoreError>
    where
        F: FnMut(&ChunkProgress) -> ControlFlow<()>,
    {
        for inserted in 1..=count {
            let decoy = generate_decoy(&self.registry, self.block_size)?;
            self.backend.put(decoy.key.as_bytes(), &decoy.value)?;
            notify(
                &mut observer,
                ChunkProgress {
                    phase: Phase::Decoys,
                    completed: inserted,
                    total: Some(count),
                },
            )?;
        }
        tracing::debug!(count, "decoys inserted");
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
