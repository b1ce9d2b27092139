//! Store configuration: plain JSON in the data directory.
//!
//! Neither field is secret, but both must match between writing and
//! reading an entry: a different cost yields different identifiers, a
//! different block size makes every stored chunk the wrong length.

use std::fs;
use std::path::{Path, PathBuf};

use latebra_crypto_core::kdf::CostParameters;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Default padded block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Smallest block that still carries one data byte plus the terminator.
pub const MIN_BLOCK_SIZE: usize = 2;

const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "chunks.db";

/// Settings shared by every entry in one data directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Padded plaintext block size; every stored chunk is this plus 28 bytes.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// scrypt cost factors.
    #[serde(default)]
    pub cost: CostParameters,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            cost: CostParameters::default(),
        }
    }
}

const fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

impl StoreConfig {
    /// Load from `{data_dir}/config.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or
    /// contains invalid JSON.
    #[must_use]
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| {
                serde_json::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "ignoring unreadable config file");
                    Self::default()
                })
            },
        )
    }

    /// Persist to `{data_dir}/config.json`.
    ///
    /// Writes to a `.tmp` file, then renames it over the target.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// file system rejects the write/rename.
    pub fn save(&self, data_dir: &Path) -> std::io::Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let tmp = data_dir.join(".config.json.tmp");

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&tmp, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &path)?;

        Ok(())
    }

    /// Check the block size and cost factors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for a block size below
    /// [`MIN_BLOCK_SIZE`], or [`StoreError::Crypto`] for bad cost factors.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(StoreError::Validation(format!(
                "block size must be at least {MIN_BLOCK_SIZE} (got {})",
                self.block_size
            )));
        }
        self.cost.validate()?;
        Ok(())
    }

    /// Location of the chunk database inside `data_dir`.
    #[must_use]
    pub fn database_path(data_dir: &Path) -> PathBuf {
        data_dir.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_values_are_correct() {
        let config = StoreConfig::default();
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.cost, CostParameters { n: 18, r: 16, p: 1 });
        config.validate().unwrap();
    }

    #[test]
    fn load_returns_default_on_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(StoreConfig::load(dir.path()), StoreConfig::default());
    }

    #[test]
    fn load_returns_default_on_corrupt_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(StoreConfig::load(dir.path()), StoreConfig::default());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{"blockSize": 512}"#).unwrap();
        let config = StoreConfig::load(dir.path());
        assert_eq!(config.block_size, 512);
        assert_eq!(config.cost, CostParameters::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            block_size: 1024,
            cost: CostParameters { n: 14, r: 8, p: 1 },
        };
        config.save(dir.path()).unwrap();
        assert_eq!(StoreConfig::load(dir.path()), config);
        assert!(!dir.path().join(".config.json.tmp").exists());
    }

    #[test]
    fn saved_file_uses_camel_case() {
        let dir = TempDir::new().unwrap();
        StoreConfig::default().save(dir.path()).unwrap();
        let contents = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert!(contents.contains("\"blockSize\""));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        StoreConfig::default().save(dir.path()).unwrap();
        let mode = fs::metadata(dir.path().join(CONFIG_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn validate_rejects_tiny_block() {
        let config = StoreConfig {
            block_size: 1,
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::Validation(_))));
    }
}
