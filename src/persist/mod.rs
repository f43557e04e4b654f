//! Durable key-value blob storage.
//!
//! The whole store serializes to a single opaque value under one key, written
//! through on every mutation. The backing file is SQLite via `rusqlite`, reduced
//! to a plain `kv(key, value)` table — no schema beyond that, no per-entity rows.

pub mod snapshot;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// The single key the conversation snapshot lives under.
pub const SNAPSHOT_KEY: &str = "conversations";

/// Durable key-value store holding opaque string blobs.
pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;

        // WAL keeps reopen-after-crash cheap for an interactive app
        conn.pragma_update(None, "journal_mode", "WAL")?;
        init_schema(&conn)?;

        tracing::info!(path = %path.display(), "key-value store initialized");
        Ok(Self { conn })
    }

    /// Open an in-memory store, primarily for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Insert or replace the value under `key`.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .context("failed to write blob")?;
        Ok(())
    }

    /// Fetch the value under `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read blob")?;
        Ok(value)
    }

    /// Size in bytes of the value under `key`, or 0 if absent.
    pub fn value_size(&self, key: &str) -> Result<u64> {
        let size: Option<i64> = self
            .conn
            .query_row(
                "SELECT length(value) FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to measure blob")?;
        Ok(size.unwrap_or(0) as u64)
    }

    /// Flip the connection read-only so every write fails. Test hook.
    #[cfg(test)]
    pub(crate) fn poison_writes(&self) {
        self.conn
            .pragma_update(None, "query_only", "ON")
            .expect("query_only pragma");
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        [],
    )
    .context("failed to initialize kv schema")?;
    Ok(())
}
