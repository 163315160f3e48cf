use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::StoreError;
use crate::kv::{expiry_ms, now_ms, KvStore};

/// SQLite-backed KV store.
///
/// Thread-safe: wraps the connection in a Mutex. Expired rows are hidden on
/// read and swept by [`SqliteKv::purge_expired`].
pub struct SqliteKv {
    db: Mutex<Connection>,
}

impl SqliteKv {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        crate::db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::new(conn)
    }

    /// Delete every expired row. Returns the number of rows removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let removed = db.execute(
            "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            rusqlite::params![now_ms()],
        )?;
        if removed > 0 {
            debug!(removed, "purged expired kv rows");
        }
        Ok(removed)
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let value = db
            .query_row(
                "SELECT value FROM kv
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                rusqlite::params![key, now_ms()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let now = chrono::Utc::now();
        db.execute(
            "INSERT INTO kv (key, value, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                expiry_ms(now.timestamp_millis(), ttl),
                now.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        db.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }
}
