//! `SQLite` chunk storage and migration runner.
//!
//! Values are already sealed, so the file itself is plain `SQLite`.
//! `secure_delete` makes `SQLite` overwrite freed pages, so a removed entry
//! does not linger in the file.

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::Backend;
use crate::error::BackendError;

// ---------------------------------------------------------------------------
// Embedded migrations
// ---------------------------------------------------------------------------

/// Forward-only SQL migrations, embedded at compile time.
/// Index 0 → version 1, index 1 → version 2, etc.
const MIGRATIONS: &[&str] = &[include_str!("../../migrations/001_chunks.sql")];

// ---------------------------------------------------------------------------
// SqliteBackend
// ---------------------------------------------------------------------------

/// [`Backend`] over one `chunks` table.
///
/// The connection sits behind a mutex so the backend is `Sync`; the store
/// issues one statement at a time.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SqliteBackend")
    }
}

impl SqliteBackend {
    /// Open (or create) the chunk database at `path`.
    ///
    /// 1. Opens the `SQLite` file.
    /// 2. Enables `secure_delete`.
    /// 3. Runs any pending migrations.
    ///
    /// # Errors
    ///
    /// - [`BackendError::Io`] if the file cannot be opened.
    /// - [`BackendError::Migration`] if a migration fails.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self, BackendError> {
        conn.execute_batch("PRAGMA secure_delete = ON;")?;
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the current schema version (`PRAGMA user_version`).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the pragma query fails.
    pub fn schema_version(&self) -> Result<i32, BackendError> {
        let conn = self.lock()?;
        schema_version(&conn)
    }

    /// Number of stored chunks, real and decoy alike.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the query fails.
    pub fn chunk_count(&self) -> Result<u64, BackendError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|_| BackendError::Io("negative row count".into()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, BackendError> {
        self.conn
            .lock()
            .map_err(|_| BackendError::Io("sqlite connection lock poisoned".into()))
    }
}

impl Backend for SqliteBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BackendError> {
        let inserted = self.lock()?.execute(
            "INSERT OR IGNORE INTO chunks (id, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        if inserted == 0 {
            return Err(BackendError::AlreadyExists);
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM chunks WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, BackendError> {
        let found: bool = self.lock()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM chunks WHERE id = ?1)",
            params![key],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn delete(&self, key: &[u8]) -> Result<(), BackendError> {
        self.lock()?
            .execute("DELETE FROM chunks WHERE id = ?1", params![key])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Migration runner
// ---------------------------------------------------------------------------

fn schema_version(conn: &Connection) -> Result<i32, BackendError> {
    let v: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(v)
}

/// Apply all pending migrations sequentially.
///
/// Each migration is wrapped in a transaction. The `user_version` pragma
/// is bumped atomically on commit.
fn run_migrations(conn: &mut Connection) -> Result<(), BackendError> {
    let current = schema_version(conn)?;

    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        let version = idx
            .checked_add(1)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| BackendError::Migration("migration index overflow".into()))?;

        if version <= current {
            continue;
        }

        let tx = conn.transaction().map_err(|e| {
            BackendError::Migration(format!(
                "failed to start transaction for migration {version}: {e}"
            ))
        })?;

        tx.execute_batch(sql)
            .map_err(|e| BackendError::Migration(format!("migration {version} failed: {e}")))?;

        tx.pragma_update(None, "user_version", version)
            .map_err(|e| {
                BackendError::Migration(format!("failed to update user_version to {version}: {e}"))
            })?;

        tx.commit().map_err(|e| {
            BackendError::Migration(format!("failed to commit migration {version}: {e}"))
        })?;

        tracing::debug!(version, "applied chunk store migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_bring_schema_to_latest() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(
            backend.schema_version().unwrap(),
            i32::try_from(MIGRATIONS.len()).unwrap()
        );
    }

    #[test]
    fn secure_delete_is_enabled() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let enabled: i64 = backend
            .lock()
            .unwrap()
            .pragma_query_value(None, "secure_delete", |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn put_refuses_overwrite() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.put(b"k", b"first").unwrap();
        assert!(matches!(
            backend.put(b"k", b"second"),
            Err(BackendError::AlreadyExists)
        ));
        assert_eq!(backend.get(b"k").unwrap().unwrap(), b"first");
    }

    #[test]
    fn get_exists_delete() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend.get(b"k").unwrap().is_none());
        assert!(!backend.exists(b"k").unwrap());

        backend.put(b"k", &[0u8, 1, 2, 255]).unwrap();
        assert!(backend.exists(b"k").unwrap());
        assert_eq!(backend.get(b"k").unwrap().unwrap(), vec![0u8, 1, 2, 255]);
        assert_eq!(backend.chunk_count().unwrap(), 1);

        backend.delete(b"k").unwrap();
        backend.delete(b"k").unwrap();
        assert!(!backend.exists(b"k").unwrap());
        assert_eq!(backend.chunk_count().unwrap(), 0);
    }
}
