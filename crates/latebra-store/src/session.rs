//! Explicit per-session context.
//!
//! A [`Session`] is built once after the password prompt and passed by
//! reference to every add/retrieve/remove call. It owns the master secret
//! for the lifetime of the session.

use std::fmt;

use latebra_crypto_core::kdf::{derive_root, CostParameters, RootSecrets};
use latebra_crypto_core::memory::{SecretBuffer, WipeRegistry};

use crate::error::StoreError;

/// Master secret, cost factors, and the registry its buffers live in.
pub struct Session {
    master: SecretBuffer,
    cost: CostParameters,
    registry: WipeRegistry,
}

impl Session {
    /// Start a session. The master secret is copied into a registry buffer;
    /// the caller should zeroize its own copy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an empty master secret and
    /// [`StoreError::Crypto`] for invalid cost factors.
    pub fn new(
        registry: &WipeRegistry,
        master_secret: &[u8],
        cost: CostParameters,
    ) -> Result<Self, StoreError> {
        if master_secret.is_empty() {
            return Err(StoreError::Validation("master password must not be empty".into()));
        }
        cost.validate()?;
        Ok(Self {
            master: registry.secret_from(master_secret)?,
            cost,
            registry: registry.clone(),
        })
    }

    /// Derive the root key and identifier for `label`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an empty label, or
    /// [`StoreError::Crypto`] if derivation fails or the session was purged.
    pub fn derive_entry(&self, label: &[u8]) -> Result<RootSecrets, StoreError> {
        if label.is_empty() {
            return Err(StoreError::Validation("label must not be empty".into()));
        }
        let master = self.master.expose()?;
        Ok(derive_root(&self.registry, &master, label, &self.cost)?)
    }

    /// Cost factors every derivation in this session uses.
    #[must_use]
    pub const fn cost(&self) -> &CostParameters {
        &self.cost
    }

    /// Registry the session allocates from.
    #[must_use]
    pub const fn registry(&self) -> &WipeRegistry {
        &self.registry
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("master", &self.master)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
