//! SQLite backed configuration cache.
//!
//! Survives restarts: a process that comes up while the CDN is unreachable
//! still serves the last configuration it saw for the project.

use super::ConfigCache;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Configuration cache persisted in SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE config_cache (
///     cache_key  TEXT PRIMARY KEY,  -- project secret or any caller chosen key
///     value      TEXT NOT NULL,     -- configuration JSON
///     updated_at TEXT NOT NULL      -- RFC 3339 timestamp
/// );
/// ```
pub struct SqliteConfigCache {
    conn: Mutex<Connection>,
    cache_key: String,
}

impl SqliteConfigCache {
    /// Opens (or creates) the database and ensures the table exists.
    ///
    /// Several projects can share one database file through distinct
    /// `cache_key`s.
    pub fn new<P: AsRef<Path>>(db_path: P, cache_key: &str) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open config cache database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS config_cache (
                cache_key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create config_cache table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            cache_key: cache_key.to_string(),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("config cache connection lock poisoned"))
    }
}

impl ConfigCache for SqliteConfigCache {
    fn read(&self) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM config_cache WHERE cache_key = ?1",
            params![self.cache_key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("Failed to read cached configuration")
    }

    fn write(&self, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn()?
            .execute(
                r#"
                INSERT INTO config_cache (cache_key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(cache_key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
                params![self.cache_key, value, now],
            )
            .context("Failed to store configuration")?;
        Ok(())
    }
}
