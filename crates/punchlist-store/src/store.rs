// ABOUTME: Record store CRUD surface and the durable write protocol it rides on.
// ABOUTME: Every mutation runs as a parameterized statement followed by an explicit checkpoint.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bootstrap::ConnectionState;

/// Errors surfaced by record store operations. A failed write never corrupts
/// the [`ConnectionState`]; the caller may retry or move on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store used before initialization or after shutdown")]
    NotInitialized,

    #[error("{op}: content must not be empty")]
    InvalidContent { op: &'static str },

    #[error("{op}: {source}")]
    Write {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// A persisted list entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Force buffered writes out of the WAL into the main database file.
/// Mandatory after every mutation in durable mode; a cheap no-op on an
/// in-memory database, issued anyway so both modes share one code path.
pub(crate) fn checkpoint(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
}

/// Timestamps are stored as fixed-width RFC 3339 text (nanosecond precision,
/// `Z` suffix) so lexicographic ORDER BY is chronological.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

impl ConnectionState {
    /// The durable write protocol: acquire the engine for the scope of one
    /// mutation, execute it, checkpoint, release. The guard is released on
    /// every exit path, so a failed statement never leaks the connection,
    /// and no checkpoint happens after a failed statement.
    async fn mutate<T>(
        &self,
        op: &'static str,
        statement: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let guard = self.engine.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        let out = statement(conn).map_err(|source| StoreError::Write { op, source })?;
        checkpoint(conn).map_err(|source| StoreError::Write { op, source })?;
        Ok(out)
    }

    /// Scoped read access; same acquisition discipline, no checkpoint.
    async fn read<T>(
        &self,
        op: &'static str,
        query: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let guard = self.engine.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        query(conn).map_err(|source| StoreError::Write { op, source })
    }

    /// Insert a new record with the next id from the sequence counter.
    /// Content must be non-empty after trimming; ids are allocated server
    /// side and never reused, even after [`Self::clear_all`].
    pub async fn add(&self, content: &str) -> Result<(), StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::InvalidContent { op: "add" });
        }

        let now = format_ts(Utc::now());
        self.mutate("add", move |conn| {
            let id: i64 = conn.query_row(
                "UPDATE records_id_seq SET next_id = next_id + 1 RETURNING next_id - 1",
                [],
                |row| row.get(0),
            )?;
            conn.execute(
                "INSERT INTO records (id, content, completed, created_at, updated_at)
                 VALUES (?1, ?2, FALSE, ?3, ?3)",
                params![id, content, now],
            )?;
            Ok(())
        })
        .await
    }

    /// All records, newest first. An empty table yields an empty Vec.
    /// Same-timestamp inserts have no defined relative order.
    pub async fn list(&self) -> Result<Vec<Record>, StoreError> {
        self.read("list", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, completed, created_at, updated_at
                 FROM records ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Record {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    completed: row.get(2)?,
                    created_at: parse_ts(3, row.get(3)?)?,
                    updated_at: parse_ts(4, row.get(4)?)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    /// Flip the completion flag of one record and bump its `updated_at`.
    /// A missing id affects zero rows and is not an error.
    pub async fn toggle(&self, id: i64) -> Result<(), StoreError> {
        let now = format_ts(Utc::now());
        self.mutate("toggle", move |conn| {
            conn.execute(
                "UPDATE records SET completed = NOT completed, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(())
        })
        .await
    }

    /// Delete every record. The id counter is left alone.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.mutate("clear_all", |conn| {
            conn.execute("DELETE FROM records", [])?;
            Ok(())
        })
        .await
    }

    /// Delete all completed records, returning how many were removed.
    pub async fn clear_completed(&self) -> Result<usize, StoreError> {
        self.mutate("clear_completed", |conn| {
            conn.execute("DELETE FROM records WHERE completed = TRUE", [])
        })
        .await
    }
}
