use crate::db::tables::MemoryEntry;
use crate::db::Database;
use std::sync::Arc;

/// Bounded FIFO log of recent user/response exchanges.
/// Appends happen exactly once per completed run; the store owns its
/// entries and evicts the oldest once the bound is reached.
pub trait MemoryStore: Send + Sync {
    fn append(&self, prompt: &str, response: &str) -> Result<(), String>;
    fn recent(&self, n: usize) -> Result<Vec<MemoryEntry>, String>;

    /// Memory rendered as a plain text block for prompt injection,
    /// oldest exchange first. Empty string when there is no history.
    fn format_for_prompt(&self) -> Result<String, String> {
        let entries = self.recent(usize::MAX)?;
        let mut lines = Vec::with_capacity(entries.len() * 2);
        for entry in &entries {
            lines.push(format!("User: {}", entry.prompt));
            lines.push(format!("Assistant: {}", entry.response));
        }
        Ok(lines.join("\n"))
    }
}

/// SQLite-backed memory store bounded to `max_entries`
pub struct SqliteMemoryStore {
    db: Arc<Database>,
    max_entries: usize,
}

impl SqliteMemoryStore {
    pub fn new(db: Arc<Database>, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        log::info!("[MEMORY] Store initialized: max_entries={}", max_entries);
        SqliteMemoryStore { db, max_entries }
    }
}

impl MemoryStore for SqliteMemoryStore {
    fn append(&self, prompt: &str, response: &str) -> Result<(), String> {
        self.db
            .append_memory_entry(prompt, response, self.max_entries)
            .map_err(|e| format!("memory append failed: {}", e))
    }

    fn recent(&self, n: usize) -> Result<Vec<MemoryEntry>, String> {
        let limit = n.min(self.max_entries);
        self.db
            .recent_memory_entries(limit)
            .map_err(|e| format!("memory read failed: {}", e))
    }
}
