//! SQLite-backed BadgeStore.

use super::{BadgeStore, StoreKey};
use crate::error::{BadgeError, BadgeResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SqliteStore {
    /// Open (or create) the badge database at `path`.
    pub fn open(path: &str) -> BadgeResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> BadgeResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> BadgeResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> BadgeResult<()> {
        self.conn()?
            .execute_batch(include_str!("../../../migrations/001_badge_store.sql"))?;
        Ok(())
    }

    /// Convenience: `open` followed by `migrate`.
    pub fn open_migrated(path: &str) -> BadgeResult<Self> {
        let store = Self::open(path)?;
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> BadgeResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| BadgeError::StoreUnavailable {
            reason: "sqlite connection lock poisoned".into(),
        })
    }

    // ── Test / summary helpers ────────────────────────────────────────

    /// Identities that currently hold at least one value.
    pub fn identities(&self) -> BadgeResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT identity FROM badge_kv ORDER BY identity ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Number of stored values for one identity (for tests).
    pub fn value_count(&self, identity: &str) -> BadgeResult<i64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM badge_kv WHERE identity = ?1",
            params![identity],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl BadgeStore for SqliteStore {
    fn get(&self, identity: &str, key: StoreKey) -> BadgeResult<Option<String>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM badge_kv WHERE identity = ?1 AND key = ?2",
                params![identity, key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, identity: &str, key: StoreKey, value: &str) -> BadgeResult<()> {
        self.conn()?.execute(
            "INSERT INTO badge_kv (identity, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identity, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![identity, key.as_str(), value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn reset_all(&self, identity: &str) -> BadgeResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for key in StoreKey::ALL {
            tx.execute(
                "DELETE FROM badge_kv WHERE identity = ?1 AND key = ?2",
                params![identity, key.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
