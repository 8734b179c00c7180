// ABOUTME: Engine bootstrapper that opens the embedded database and applies the schema.
// ABOUTME: Falls back from a durable file-backed database to a volatile in-memory one on any open failure.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::probe::probe_durable_storage_support;

/// Errors that can occur while bootstrapping the embedded engine.
/// A failure to open the durable backend is NOT one of them; that case
/// falls back to a volatile database and is only logged.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("embedded engine failed to initialize: {0}")]
    Engine(#[from] rusqlite::Error),
}

/// Whether writes survive a process restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// File-backed database under WAL; checkpointed writes survive restart.
    Durable,
    /// In-memory database; all data is lost when the store shuts down.
    Volatile,
}

/// Options for [`initialize`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Where the durable database file lives (or would live).
    pub path: PathBuf,
    /// When false, skip the durable attempt entirely and open in-memory.
    pub prefer_durable: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("punchlist.db"),
            prefer_durable: true,
        }
    }
}

/// Exclusive ownership of the embedded engine plus the durability mode fixed
/// at bootstrap. The handle is `None` only after [`crate::shutdown`]; every
/// record store operation goes through it. Single logical writer: the mutex
/// serializes statements, but no cross-call ordering is promised for
/// concurrently spawned mutations.
pub struct ConnectionState {
    pub(crate) engine: Mutex<Option<Connection>>,
    mode: DurabilityMode,
}

impl ConnectionState {
    /// The durability mode chosen at bootstrap. Fixed for the session.
    pub fn durability_mode(&self) -> DurabilityMode {
        self.mode
    }
}

/// Open the embedded database and ensure the schema exists.
///
/// Probes durable storage support once, attempts the file-backed open when
/// supported and requested, and silently falls back to an in-memory database
/// on any durable-open failure (permissions, corruption, quota). Returns a
/// fully usable [`ConnectionState`] or fails with [`BootstrapError`] only
/// when the engine itself cannot be instantiated.
pub fn initialize(options: &InitOptions) -> Result<ConnectionState, BootstrapError> {
    let supported = probe_durable_storage_support(&options.path);

    if supported && options.prefer_durable {
        match open_durable(&options.path) {
            Ok(conn) => {
                tracing::info!("opened durable database at {}", options.path.display());
                return Ok(ConnectionState {
                    engine: Mutex::new(Some(conn)),
                    mode: DurabilityMode::Durable,
                });
            }
            Err(e) => {
                tracing::warn!(
                    "durable open of {} failed, falling back to in-memory database: {}",
                    options.path.display(),
                    e
                );
            }
        }
    }

    let conn = open_volatile()?;
    tracing::info!("opened volatile in-memory database");
    Ok(ConnectionState {
        engine: Mutex::new(Some(conn)),
        mode: DurabilityMode::Volatile,
    })
}

fn open_durable(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    // WAL keeps committed frames in the log until an explicit checkpoint
    // moves them into the main file; the write protocol issues that
    // checkpoint after every mutation.
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    apply_schema(&conn)?;
    Ok(conn)
}

fn open_volatile() -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_in_memory()?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Create the records table and the id counter if absent. Idempotent: safe
/// against a pre-existing, already-migrated durable file. The counter row is
/// seeded with 1 only when the table is empty, so reopening never rewinds
/// the sequence.
fn apply_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY,
            content TEXT NOT NULL,
            completed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS records_id_seq (
            next_id INTEGER NOT NULL
        );

        INSERT INTO records_id_seq (next_id)
        SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM records_id_seq);",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::shutdown;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn initialize_durable_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("punchlist.db");

        let state = initialize(&InitOptions {
            path: path.clone(),
            prefer_durable: true,
        })
        .unwrap();

        assert_eq!(state.durability_mode(), DurabilityMode::Durable);
        assert!(path.exists());
    }

    #[test]
    fn initialize_volatile_when_not_requested() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("punchlist.db");

        let state = initialize(&InitOptions {
            path: path.clone(),
            prefer_durable: false,
        })
        .unwrap();

        assert_eq!(state.durability_mode(), DurabilityMode::Volatile);
        assert!(!path.exists(), "volatile mode must not touch the durable path");
    }

    #[test]
    fn initialize_falls_back_when_probe_rejects_path() {
        let dir = TempDir::new().unwrap();

        // The target is a directory, so the probe reports unsupported.
        let state = initialize(&InitOptions {
            path: dir.path().to_path_buf(),
            prefer_durable: true,
        })
        .unwrap();

        assert_eq!(state.durability_mode(), DurabilityMode::Volatile);
    }

    #[test]
    fn initialize_falls_back_on_corrupt_durable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("punchlist.db");
        fs::write(&path, b"this is not a database").unwrap();

        let state = initialize(&InitOptions {
            path,
            prefer_durable: true,
        })
        .unwrap();

        assert_eq!(state.durability_mode(), DurabilityMode::Volatile);
    }

    #[tokio::test]
    async fn schema_is_idempotent_across_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("punchlist.db");
        let options = InitOptions {
            path,
            prefer_durable: true,
        };

        let state = initialize(&options).unwrap();
        state.add("first").await.unwrap();
        shutdown(&state).await;

        let state = initialize(&options).unwrap();
        assert_eq!(state.durability_mode(), DurabilityMode::Durable);

        let records = state.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "first");

        // The counter survived the reopen, so new ids keep increasing.
        state.add("second").await.unwrap();
        let records = state.list().await.unwrap();
        let first_id = records.iter().find(|r| r.content == "first").unwrap().id;
        let second_id = records.iter().find(|r| r.content == "second").unwrap().id;
        assert!(second_id > first_id);
    }
}
