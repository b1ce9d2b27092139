//! Secure memory for passwords, derived keys, and decrypted plaintext.
//!
//! This module provides:
//! - [`WipeRegistry`]: the process-wide record of live secret buffers.
//!   It is an explicit object: the application constructs one at startup
//!   and passes it to every allocation. [`WipeRegistry::purge`] zeroes
//!   every buffer that is still alive, which is what the shutdown/signal
//!   handler calls.
//! - [`SecretBuffer`]: fixed-length heap buffer that is `mlock`ed on a
//!   best-effort basis and is zeroed, unlocked, then freed on drop.
//! - [`disable_core_dumps`]: keep secrets out of core files.
//!
//! # Lifecycle
//!
//! `Allocated → {Locked | LockFailed} → Wiped → Freed`. Reading through
//! [`SecretBuffer::expose`] after the buffer reached `Wiped` fails with
//! [`CryptoError::BufferWiped`].

use crate::error::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, ExposeSecretMut, SecretSlice};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Platform-specific memory locking
// ---------------------------------------------------------------------------

/// RAII guard over an `mlock`ed region.
///
/// The region is released explicitly by [`Slot::wipe`] after the bytes are
/// zeroed; `Drop` only covers the case where a wipe never happened.
pub(crate) struct LockedRegion {
    ptr: *const u8,
    len: usize,
    locked: bool,
}

// SAFETY: The pointer is only handed to mlock/munlock, which are
// thread-safe. The bytes themselves are owned by the enclosing `Slot` and
// are never accessed through `LockedRegion`.
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

impl LockedRegion {
    /// Attempt to lock a memory region.
    ///
    /// A refused lock (no privilege, `RLIMIT_MEMLOCK` exhausted, platform
    /// without support) is not an error: it is logged once per process and
    /// the region is still wiped on release.
    #[must_use]
    fn try_lock(ptr: *const u8, len: usize) -> Self {
        let locked = platform::try_mlock(ptr, len);
        if !locked && len > 0 {
            static WARNED: std::sync::Once = std::sync::Once::new();
            WARNED.call_once(|| {
                tracing::warn!(
                    "mlock failed; secret data may be swapped to disk \
                     (consider raising RLIMIT_MEMLOCK). Buffers are still \
                     wiped on release."
                );
            });
        }
        Self { ptr, len, locked }
    }

    const fn is_locked(&self) -> bool {
        self.locked
    }

    fn release(&mut self) {
        if self.locked {
            platform::try_munlock(self.ptr, self.len);
            self.locked = false;
        }
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Slot: the shared storage behind one SecretBuffer
// ---------------------------------------------------------------------------

/// Observable lifecycle state of a [`SecretBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferState {
    /// Allocated and pinned in RAM.
    Locked,
    /// Allocated, but the OS refused the lock request.
    LockFailed,
    /// Zeroed. No further reads are possible.
    Wiped,
    /// A read or write guard is held right now, so the state could not be
    /// sampled without waiting.
    InUse,
}

struct Slot {
    bytes: SecretSlice<u8>,
    lock: LockedRegion,
    wiped: bool,
}

impl Slot {
    fn zeroed(len: usize) -> Self {
        // `vec![0; len]` has capacity == len, so boxing does not reallocate
        // and the locked address stays valid for the lifetime of the slot.
        let bytes: SecretSlice<u8> = vec![0u8; len].into();
        let exposed = bytes.expose_secret();
        let lock = LockedRegion::try_lock(exposed.as_ptr(), exposed.len());
        Self {
            bytes,
            lock,
            wiped: false,
        }
    }

    const fn state(&self) -> BufferState {
        if self.wiped {
            BufferState::Wiped
        } else if self.lock.is_locked() {
            BufferState::Locked
        } else {
            BufferState::LockFailed
        }
    }

    /// Zero, then unlock. Returns `false` if the slot was already wiped.
    fn wipe(&mut self) -> bool {
        if self.wiped {
            return false;
        }
        self.bytes.expose_secret_mut().zeroize();
        self.lock.release();
        self.wiped = true;
        true
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.wipe();
    }
}

type SharedSlot = Arc<Mutex<Slot>>;

fn poisoned() -> CryptoError {
    CryptoError::SecureMemory("secret buffer lock poisoned".into())
}

/// Sample a slot without blocking. `None` means a guard is held.
fn peek<T>(slot: &SharedSlot, f: impl FnOnce(&Slot) -> T) -> Option<T> {
    match slot.try_lock() {
        Ok(guard) => Some(f(&guard)),
        Err(TryLockError::Poisoned(p)) => Some(f(&p.into_inner())),
        Err(TryLockError::WouldBlock) => None,
    }
}

// ---------------------------------------------------------------------------
// WipeRegistry
// ---------------------------------------------------------------------------

/// Registry of every live [`SecretBuffer`].
///
/// Cloning is cheap and yields a handle to the same registry. Buffers are
/// tracked through weak references, so the registry never extends a
/// buffer's lifetime; dropping a buffer wipes it immediately.
#[derive(Clone, Default)]
pub struct WipeRegistry {
    slots: Arc<Mutex<Vec<Weak<Mutex<Slot>>>>>,
}

impl WipeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zero-filled buffer of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the registry lock is poisoned.
    pub fn alloc(&self, len: usize) -> Result<SecretBuffer, CryptoError> {
        let slot = Arc::new(Mutex::new(Slot::zeroed(len)));
        self.track(&slot)?;
        Ok(SecretBuffer { slot, len })
    }

    /// Allocate a buffer and copy `data` into it.
    ///
    /// The copy goes straight into the locked allocation. The caller should
    /// zeroize the source afterwards.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the registry lock is poisoned.
    pub fn secret_from(&self, data: &[u8]) -> Result<SecretBuffer, CryptoError> {
        let mut buf = self.alloc(data.len())?;
        buf.expose_mut()?.copy_from_slice(data);
        Ok(buf)
    }

    /// Allocate a buffer filled from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn random(&self, len: usize) -> Result<SecretBuffer, CryptoError> {
        let mut buf = self.alloc(len)?;
        {
            let mut bytes = buf.expose_mut()?;
            OsRng
                .try_fill_bytes(&mut bytes[..])
                .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
        }
        Ok(buf)
    }

    /// Allocate a buffer holding the concatenation of `parts`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Validation` if the total length overflows.
    pub fn concat(&self, parts: &[&[u8]]) -> Result<SecretBuffer, CryptoError> {
        let total = parts
            .iter()
            .try_fold(0usize, |acc, part| acc.checked_add(part.len()))
            .ok_or_else(|| CryptoError::Validation("concatenated length overflows".into()))?;

        let mut buf = self.alloc(total)?;
        {
            let mut bytes = buf.expose_mut()?;
            let mut offset = 0usize;
            for part in parts {
                let end = offset.saturating_add(part.len());
                bytes[offset..end].copy_from_slice(part);
                offset = end;
            }
        }
        Ok(buf)
    }

    /// Number of buffers that are alive and not yet wiped.
    ///
    /// Never blocks. A buffer whose guard is currently held counts as
    /// outstanding.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.live_slots()
            .iter()
            .filter(|slot| peek(slot, |slot| !slot.wiped).unwrap_or(true))
            .count()
    }

    /// Wipe every outstanding buffer and return how many were wiped.
    ///
    /// Safe to call from a signal-handling task while other threads hold
    /// buffers: each buffer is wiped under its own lock, so a purge waits
    /// for an in-flight read to finish and the reader's next access fails
    /// with [`CryptoError::BufferWiped`]. Idempotent.
    ///
    /// Must not be called on a thread that still holds an
    /// [`expose`](SecretBuffer::expose) guard: that purge would wait on
    /// itself.
    pub fn purge(&self) -> usize {
        // Snapshot first: the registry lock must not be held while taking
        // buffer locks, since allocation takes them in the opposite order.
        let live = self.live_slots();
        let mut wiped = 0usize;
        for slot in &live {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.wipe() {
                wiped = wiped.saturating_add(1);
            }
        }
        tracing::debug!(wiped, "purged secret buffers");
        wiped
    }

    fn live_slots(&self) -> Vec<SharedSlot> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().filter_map(Weak::upgrade).collect()
    }

    fn track(&self, slot: &SharedSlot) -> Result<(), CryptoError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| CryptoError::SecureMemory("wipe registry lock poisoned".into()))?;
        slots.retain(|weak| weak.strong_count() > 0);
        slots.push(Arc::downgrade(slot));
        Ok(())
    }
}

impl fmt::Debug for WipeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WipeRegistry")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SecretBuffer
// ---------------------------------------------------------------------------

/// Fixed-length buffer for sensitive data, allocated through a
/// [`WipeRegistry`].
///
/// - `mlock` on allocation (soft fallback if unavailable)
/// - Masked `Debug` output (`SecretBuffer(***)`)
/// - Zeroed, unlocked, then freed on drop, or earlier on [`wipe`](Self::wipe)
///   or [`WipeRegistry::purge`]
pub struct SecretBuffer {
    slot: SharedSlot,
    len: usize,
}

impl SecretBuffer {
    /// Borrow the bytes for reading.
    ///
    /// Keep the guard short-lived: a shutdown purge waits for it.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::BufferWiped` if the buffer was wiped.
    pub fn expose(&self) -> Result<SecretRef<'_>, CryptoError> {
        let guard = self.slot.lock().map_err(|_| poisoned())?;
        if guard.wiped {
            return Err(CryptoError::BufferWiped);
        }
        Ok(SecretRef { guard })
    }

    /// Borrow the bytes for writing.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::BufferWiped` if the buffer was wiped.
    pub fn expose_mut(&mut self) -> Result<SecretMut<'_>, CryptoError> {
        let guard = self.slot.lock().map_err(|_| poisoned())?;
        if guard.wiped {
            return Err(CryptoError::BufferWiped);
        }
        Ok(SecretMut { guard })
    }

    /// Returns the number of bytes in the buffer.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current lifecycle state.
    ///
    /// Never blocks: returns [`BufferState::InUse`] while a guard is held.
    #[must_use]
    pub fn state(&self) -> BufferState {
        peek(&self.slot, Slot::state).unwrap_or(BufferState::InUse)
    }

    /// Returns `true` if the underlying memory is `mlock`ed.
    #[must_use]
    pub fn is_mlocked(&self) -> bool {
        self.state() == BufferState::Locked
    }

    /// Zero the buffer now instead of waiting for drop.
    ///
    /// Waits for any outstanding guard on this buffer.
    pub fn wipe(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .wipe();
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

/// Read guard returned by [`SecretBuffer::expose`].
pub struct SecretRef<'a> {
    guard: MutexGuard<'a, Slot>,
}

impl Deref for SecretRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard.bytes.expose_secret()
    }
}

impl fmt::Debug for SecretRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretRef(***)")
    }
}

/// Write guard returned by [`SecretBuffer::expose_mut`].
pub struct SecretMut<'a> {
    guard: MutexGuard<'a, Slot>,
}

impl Deref for SecretMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.guard.bytes.expose_secret()
    }
}

impl DerefMut for SecretMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.guard.bytes.expose_secret_mut()
    }
}

impl fmt::Debug for SecretMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMut(***)")
    }
}

// ---------------------------------------------------------------------------
// Core dump disabling
// ---------------------------------------------------------------------------

/// Disable core dumps for the current process.
///
/// On Unix: sets `RLIMIT_CORE` to 0 (both soft and hard limits).
/// On non-Unix: no-op (returns `Ok`).
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the `setrlimit` call fails.
pub fn disable_core_dumps() -> Result<(), CryptoError> {
    platform::disable_core_dumps_impl()
}

// ---------------------------------------------------------------------------
// Platform-specific implementations
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod platform {
    use crate::error::CryptoError;

    pub(super) fn try_mlock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock is safe to call with any valid pointer/length pair.
        // If the pointer is invalid, the kernel returns ENOMEM which we handle.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn try_munlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: munlock is safe to call. Failure is non-critical.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }

    pub(super) fn disable_core_dumps_impl() -> Result<(), CryptoError> {
        let limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit with RLIMIT_CORE is a standard POSIX call.
        let ret = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &raw const limit) };
        if ret != 0 {
            return Err(CryptoError::SecureMemory(
                "failed to disable core dumps via RLIMIT_CORE".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod platform {
    use crate::error::CryptoError;

    pub(super) fn try_mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn try_munlock(_ptr: *const u8, _len: usize) {}

    pub(super) fn disable_core_dumps_impl() -> Result<(), CryptoError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
