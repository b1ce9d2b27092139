//! Per-invocation application state.
//!
//! Holds the resolved data directory, the effective configuration, and the
//! wipe registry every secret of this process is allocated from. The
//! registry is shared with the signal supervisor, which purges it on exit.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use latebra_crypto_core::kdf::CostParameters;
use latebra_crypto_core::memory::WipeRegistry;
use latebra_store::{EntryStore, Session, SqliteBackend, StoreConfig};

/// Directory name under the user's home when neither `--home` nor
/// `LATEBRA_HOME` is set.
const DEFAULT_DIR_NAME: &str = ".latebra";

/// Pick the data directory: explicit flag/env value, else `~/.latebra`.
///
/// # Errors
///
/// Returns an error if no override is given and the home directory cannot
/// be determined.
pub fn resolve_data_dir(home: Option<PathBuf>) -> Result<PathBuf> {
    match home {
        Some(dir) => Ok(dir),
        None => dirs::home_dir()
            .map(|home| home.join(DEFAULT_DIR_NAME))
            .context("cannot determine home directory; pass --home or set LATEBRA_HOME"),
    }
}

// ── Application state ──────────────────────────────────────────────

/// Everything a command needs besides the password.
#[derive(Debug)]
pub struct AppState {
    /// Directory holding `config.json` and `chunks.db`.
    pub data_dir: PathBuf,
    /// Stored configuration with any `-c` override applied.
    pub config: StoreConfig,
    /// Registry shared with the signal supervisor.
    pub registry: WipeRegistry,
}

impl AppState {
    /// Create the data directory if needed and load its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn load(
        data_dir: PathBuf,
        cost_override: Option<CostParameters>,
        registry: WipeRegistry,
    ) -> Result<Self> {
        create_private_dir(&data_dir)?;

        let mut config = StoreConfig::load(&data_dir);
        if let Some(cost) = cost_override {
            config.cost = cost;
        }
        tracing::debug!(
            block_size = config.block_size,
            cost = %config.cost,
            "configuration loaded"
        );

        Ok(Self {
            data_dir,
            config,
            registry,
        })
    }

    /// Open the chunk database with the configured block size.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub fn open_store(&self) -> Result<EntryStore<SqliteBackend>> {
        self.config.validate()?;
        let path = StoreConfig::database_path(&self.data_dir);
        let backend = SqliteBackend::open(&path)
            .with_context(|| format!("opening chunk database {}", path.display()))?;
        Ok(EntryStore::new(
            backend,
            self.registry.clone(),
            self.config.block_size,
        )?)
    }

    /// Start a session for `password` with the configured cost.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty password or invalid cost factors.
    pub fn unlock(&self, password: &[u8]) -> Result<Session> {
        Ok(Session::new(&self.registry, password, self.config.cost)?)
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}
