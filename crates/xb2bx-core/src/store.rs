// Durable key-value persistence for client-side state.
//
// The session layer only needs get/set/clear over string keys, so that is
// the whole port. `SqliteStore` is the durable implementation; `MemoryStore`
// backs tests and throwaway sessions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::{info, warn};

/// Key-value persistence port.
///
/// Multi-key writes and clears are all-or-nothing: a reader never observes
/// half of a `set` or `clear`.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write every `(key, value)` pair in one transaction, replacing any
    /// previous values.
    fn set(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove every key in `keys` in one transaction. Missing keys are
    /// ignored.
    fn clear(&self, keys: &[&str]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// SQLite-backed key-value store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path` and ensure the state
    /// table exists. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the session database, recovering from a file that cannot be
    /// opened.
    ///
    /// An unreadable database is moved aside to `<path>.corrupt` and a fresh
    /// one is created in its place. If that also fails the session lives in
    /// memory for this run. Never fails, so startup always reaches the login
    /// screen.
    pub fn open_or_recover(path: &str) -> Arc<dyn KeyValueStore> {
        let first_error = match SqliteStore::open(path) {
            Ok(store) => return Arc::new(store),
            Err(e) => e,
        };
        warn!("Session database at {} is unusable: {:#}", path, first_error);

        let aside = format!("{path}.corrupt");
        match std::fs::rename(path, &aside) {
            Ok(()) => {
                info!("Moved unusable session database to {}", aside);
                for suffix in ["-wal", "-shm"] {
                    let _ = std::fs::remove_file(format!("{path}{suffix}"));
                }
                match SqliteStore::open(path) {
                    Ok(store) => return Arc::new(store),
                    Err(e) => warn!("Recreating session database failed: {:#}", e),
                }
            }
            Err(e) => warn!("Could not move session database aside: {}", e),
        }

        warn!("Falling back to an in-memory session store");
        Arc::new(MemoryStore::new())
    }

    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM kv_state WHERE key = ?1")
            .context("failed to prepare kv lookup")?;

        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query kv state")?;

        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read kv row")?)),
            None => Ok(None),
        }
    }

    fn set(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO kv_state (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .with_context(|| format!("failed to write key {key}"))?;
        }
        tx.commit().context("failed to commit kv write")?;
        Ok(())
    }

    fn clear(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        for key in keys {
            tx.execute("DELETE FROM kv_state WHERE key = ?1", params![key])
                .with_context(|| format!("failed to delete key {key}"))?;
        }
        tx.commit().context("failed to commit kv clear")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Mutex-guarded map. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().expect("memory store mutex poisoned")
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut map = self.entries();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn clear(&self, keys: &[&str]) -> Result<()> {
        let mut map = self.entries();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
