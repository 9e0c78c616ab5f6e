use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::store::Store;

/// Embedded-database store backend: one `collections` row per key in a
/// workspace sqlite3 file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!(
                "failed to create workspace {}",
                workspace.to_string_lossy()
            )
        })?;
        let db_path = workspace.join("roster.sqlite3");
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections(
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM collections WHERE key = ?",
                [key],
                |r| r.get(0),
            )
            .optional()
            .with_context(|| format!("failed to load collection {}", key))?;
        Ok(payload)
    }

    fn save(&mut self, key: &str, payload: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                "INSERT INTO collections(key, payload) VALUES(?, ?)
                 ON CONFLICT(key) DO UPDATE SET payload = excluded.payload",
                (key, payload),
            )
            .with_context(|| format!("failed to save collection {}", key))?;
        Ok(())
    }
}
