use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result as SqliteResult;
use std::path::Path;

pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// SQLite database behind an r2d2 connection pool.
/// Table operations live in per-table impl blocks under `db::tables`.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, String> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create database directory: {}", e))?;
            }
        }

        // WAL + busy timeout so concurrent runs serialize appends instead of
        // failing with SQLITE_BUSY
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
        });
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| format!("Failed to create connection pool: {}", e))?;

        let db = Database { pool };
        db.init().map_err(|e| format!("Failed to initialize schema: {}", e))?;
        Ok(db)
    }

    /// In-memory database for tests
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, String> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| format!("Failed to create connection pool: {}", e))?;
        let db = Database { pool };
        db.init().map_err(|e| format!("Failed to initialize schema: {}", e))?;
        Ok(db)
    }

    pub fn conn(&self) -> DbConn {
        self.pool.get().expect("Failed to get connection from pool")
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memory_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memory_created ON memory_entries(created_at);

            CREATE TABLE IF NOT EXISTS mailbox_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mailbox_thread ON mailbox_messages(thread_id);",
        )?;

        Ok(())
    }
}
