use rusqlite::{Connection, OptionalExtension};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::types::RoundInfo;

/// Cross-run memory: a flat key/value table holding JSON values. Keys are
/// namespaced with dots (`last_round`, `buy_rounds.1101`).
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &str) -> Result<Store> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    rusqlite::Error::SqliteFailure(
                        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                        Some(format!("failed to create {}: {e}", parent.display())),
                    )
                })?;
            }
        }
        Store::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Store> {
        Store::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Store> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bot_memory (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(Store { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM bot_memory WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO bot_memory (key, value, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)",
            (key, value.to_string()),
        )?;
        Ok(())
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM bot_memory WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn last_round(&self) -> Result<Option<RoundInfo>> {
        match self.get("last_round")? {
            Some(value) => Ok(serde_json::from_value(value).ok()),
            None => Ok(None),
        }
    }

    pub fn set_last_round(&self, round: &RoundInfo) -> Result<()> {
        self.set("last_round", &serde_json::to_value(round)?)
    }

    pub fn record_purchase(&self, round: i64, numbers: &[Vec<u8>]) -> Result<()> {
        self.set(&format!("buy_rounds.{round}"), &json!({ "numbers": numbers }))
    }

    pub fn purchased_numbers(&self, round: i64) -> Result<Option<Vec<Vec<u8>>>> {
        let Some(value) = self.get(&format!("buy_rounds.{round}"))? else {
            return Ok(None);
        };
        Ok(value
            .get("numbers")
            .cloned()
            .and_then(|numbers| serde_json::from_value(numbers).ok()))
    }
}
