use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use shiori_api::TokenStore;

use crate::error::ShioriError;

const SCHEMA_V1: &str = include_str!("../../../migrations/001_auth_tokens.sql");

/// SQLite-backed token storage, one row per backend storage key.
pub struct TokenDb {
    conn: Mutex<Connection>,
}

impl TokenDb {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, ShioriError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, ShioriError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn save_token(&self, key: &str, token: &str) -> Result<(), ShioriError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR REPLACE INTO auth_tokens (key, token, updated_at)
             VALUES (?1, ?2, datetime('now'))",
            params![key, token],
        )?;
        Ok(())
    }

    pub fn get_token(&self, key: &str) -> Result<Option<String>, ShioriError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT token FROM auth_tokens WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn delete_token(&self, key: &str) -> Result<(), ShioriError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM auth_tokens WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl TokenStore for TokenDb {
    fn get(&self, key: &str) -> Option<String> {
        match self.get_token(key) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read token");
                None
            }
        }
    }

    fn set(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(token) => self.save_token(key, token),
            None => self.delete_token(key),
        };
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to persist token");
        }
    }
}

fn run_migrations(conn: &Connection) -> Result<(), ShioriError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}
