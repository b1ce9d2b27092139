//! Entry commands: add, get, forget, decoys.
//!
//! Each handler takes an open store and, where needed, an unlocked
//! session. Status lines go to stderr; entry contents go to `out` or to a
//! freshly created file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use latebra_crypto_core::CryptoError;
use latebra_store::{Backend, EntryStore, Integrity, RemoveOutcome, Session, StoreError};

const BEGIN_MARKER: &str = "-----BEGIN PLAINTEXT-----";
const END_MARKER: &str = "-----END PLAINTEXT-----";

/// Store `data` under `label`.
///
/// # Errors
///
/// Fails if an entry already exists for this password and label, or on any
/// store error.
pub fn add<B: Backend>(
    store: &EntryStore<B>,
    session: &Session,
    label: &str,
    data: &[u8],
) -> Result<()> {
    eprintln!("[i] Deriving keys...");
    match store.add(session, label.as_bytes(), data) {
        Ok(summary) => {
            eprintln!(
                "[+] Stored {} bytes in {} chunks.",
                data.len(),
                summary.metadata_chunks.saturating_add(summary.data_chunks)
            );
            Ok(())
        }
        Err(StoreError::AlreadyExists) => {
            bail!("an entry already exists for this password and label; forget it first")
        }
        Err(e) => Err(e).context("storing entry"),
    }
}

/// Retrieve the entry under `label` into `to` or between markers on `out`.
///
/// # Errors
///
/// Fails if no entry opens with this password and label, if `to` already
/// exists, or on any store or I/O error.
pub fn get<B: Backend, W: Write>(
    store: &EntryStore<B>,
    session: &Session,
    label: &str,
    to: Option<&Path>,
    out: &mut W,
) -> Result<()> {
    eprintln!("[i] Deriving keys...");
    let entry = match store.retrieve(session, label.as_bytes()) {
        Ok(entry) => entry,
        Err(StoreError::NotFound) => bail!("no entry found for this password and label"),
        Err(StoreError::Crypto(CryptoError::AuthenticationFailed)) => {
            bail!("entry failed authentication; it is corrupted or was tampered with")
        }
        Err(e) => return Err(e).context("retrieving entry"),
    };

    if let Integrity::Incomplete {
        declared,
        recovered,
    } = entry.integrity
    {
        eprintln!("[!] Entry is incomplete: expected {declared} bytes, recovered {recovered}.");
    }

    let data = entry.data.expose()?;
    match to {
        Some(path) => {
            write_new_file(path, &data)?;
            eprintln!("[+] Wrote {} bytes to {}.", data.len(), path.display());
        }
        None => {
            writeln!(out, "{BEGIN_MARKER}")?;
            out.write_all(&data)?;
            writeln!(out)?;
            writeln!(out, "{END_MARKER}")?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Delete the entry under `label`.
///
/// # Errors
///
/// Fails on store errors. A missing entry is reported, not an error.
pub fn forget<B: Backend>(store: &EntryStore<B>, session: &Session, label: &str) -> Result<()> {
    eprintln!("[i] Deriving keys...");
    match store
        .remove(session, label.as_bytes())
        .context("removing entry")?
    {
        RemoveOutcome::Removed { chunks } => eprintln!("[+] Removed {chunks} chunks."),
        RemoveOutcome::NothingToRemove => {
            eprintln!("[i] Nothing to remove for this password and label.");
        }
    }
    Ok(())
}

/// Insert `count` decoy chunks.
///
/// # Errors
///
/// Fails on store errors; decoys already inserted stay.
pub fn decoys<B: Backend>(store: &EntryStore<B>, count: usize) -> Result<()> {
    let inserted = store.insert_decoys(count).context("inserting decoys")?;
    eprintln!("[+] Inserted {inserted} decoys.");
    Ok(())
}

/// Create `path` exclusively (mode 0600 on Unix) and write `data`.
fn write_new_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("creating {} (it must not exist yet)", path.display()))?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use latebra_crypto_core::kdf::CostParameters;
    use latebra_crypto_core::memory::WipeRegistry;
    use latebra_store::MemoryBackend;
    use tempfile::TempDir;

    const TEST_COST: CostParameters = CostParameters { n: 4, r: 1, p: 1 };

    fn setup() -> (EntryStore<MemoryBackend>, Session) {
        let registry = WipeRegistry::new();
        let store = EntryStore::new(MemoryBackend::new(), registry.clone(), 64).unwrap();
        let session = Session::new(&registry, b"yellow submarine", TEST_COST).unwrap();
        (store, session)
    }

    #[test]
    fn get_prints_between_markers() {
        let (store, session) = setup();
        add(&store, &session, "test", b"hello world").unwrap();

        let mut out = Vec::new();
        get(&store, &session, "test", None, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "-----BEGIN PLAINTEXT-----\nhello world\n-----END PLAINTEXT-----\n"
        );
    }

    #[test]
    fn get_writes_new_file_only() {
        let (store, session) = setup();
        add(&store, &session, "test", b"to disk").unwrap();

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.bin");
        get(&store, &session, "test", Some(&path), &mut Vec::new()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"to disk");

        assert!(get(&store, &session, "test", Some(&path), &mut Vec::new()).is_err());
    }

    #[test]
    fn second_add_fails() {
        let (store, session) = setup();
        add(&store, &session, "test", b"one").unwrap();
        let err = add(&store, &session, "test", b"two").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn get_missing_fails() {
        let (store, session) = setup();
        let err = get(&store, &session, "nope", None, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("no entry found"));
    }

    #[test]
    fn forget_then_forget_again() {
        let (store, session) = setup();
        add(&store, &session, "test", b"gone soon").unwrap();
        forget(&store, &session, "test").unwrap();
        forget(&store, &session, "test").unwrap();
        assert!(store.backend().is_empty().unwrap());
    }

    #[test]
    fn decoys_land_in_backend() {
        let (store, _) = setup();
        decoys(&store, 3).unwrap();
        assert_eq!(store.backend().len().unwrap(), 3);
    }
}
