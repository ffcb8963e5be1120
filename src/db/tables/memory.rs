//! Conversation memory database operations (memory_entries)

use chrono::Utc;
use rusqlite::Result as SqliteResult;
use serde::{Deserialize, Serialize};

use super::super::Database;

/// One completed user/response exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: i64,
    pub prompt: String,
    pub response: String,
    pub created_at: String,
}

impl Database {
    /// Append one exchange and evict everything beyond the newest
    /// `max_entries` rows (strict FIFO). The insert and the eviction run in
    /// one transaction so concurrent appends never observe a half-written
    /// state or break the bound.
    pub fn append_memory_entry(
        &self,
        prompt: &str,
        response: &str,
        max_entries: usize,
    ) -> SqliteResult<()> {
        let mut conn = self.conn();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO memory_entries (prompt, response, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![prompt, response, &now],
        )?;
        tx.execute(
            "DELETE FROM memory_entries
             WHERE id NOT IN (
                 SELECT id FROM memory_entries ORDER BY id DESC LIMIT ?1
             )",
            [max_entries as i64],
        )?;
        tx.commit()?;

        log::debug!("[MEMORY] Entry saved at {}", now);
        Ok(())
    }

    /// The most recent `limit` exchanges, oldest first
    pub fn recent_memory_entries(&self, limit: usize) -> SqliteResult<Vec<MemoryEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, prompt, response, created_at FROM (
                 SELECT id, prompt, response, created_at
                 FROM memory_entries ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
        )?;

        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(MemoryEntry {
                    id: row.get(0)?,
                    prompt: row.get(1)?,
                    response: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// Total retained entries
    pub fn count_memory_entries(&self) -> SqliteResult<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))
    }
}
