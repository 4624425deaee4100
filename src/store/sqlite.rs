use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::util::now_utc_string;

use super::RecordStore;

pub struct SqliteStore {
    db_path: PathBuf,
    connection: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open sqlite db {}", db_path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;

        Ok(Self {
            db_path: db_path.to_path_buf(),
            connection,
        })
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
              id TEXT PRIMARY KEY,
              body TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create records table")
}

impl RecordStore for SqliteStore {
    fn describe(&self) -> String {
        self.db_path.display().to_string()
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut statement = self
            .connection
            .prepare("SELECT id FROM records WHERE id LIKE 'section\\_%' ESCAPE '\\' ORDER BY id")
            .context("failed to prepare record listing")?;
        let rows = statement
            .query_map([], |row| row.get::<_, String>(0))
            .context("failed to list records")?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.context("failed to read record id")?);
        }
        Ok(keys)
    }

    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        self.connection
            .query_row("SELECT body FROM records WHERE id = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("failed to load record {key}"))
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        let body = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize record {key}"))?;
        self.connection
            .execute(
                "INSERT INTO records (id, body, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![key, body, now_utc_string()],
            )
            .with_context(|| format!("failed to save record {key}"))?;
        Ok(())
    }

    fn manifest_dir(&self) -> PathBuf {
        self.db_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join("manifests")
    }
}
