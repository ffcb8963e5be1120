use crate::db::tables::MailboxMessage;
use crate::db::Database;
use serde_json::Value;
use std::sync::Arc;

/// Append-only log of inter-agent messages keyed by thread_id.
/// Within one thread the history is a total order by insertion time.
pub trait MailboxStore: Send + Sync {
    fn send(
        &self,
        sender: &str,
        recipient: &str,
        content: Value,
        thread_id: &str,
    ) -> Result<(), String>;

    fn thread(&self, thread_id: &str) -> Result<Vec<MailboxMessage>, String>;
}

/// SQLite-backed mailbox store
pub struct SqliteMailboxStore {
    db: Arc<Database>,
}

impl SqliteMailboxStore {
    pub fn new(db: Arc<Database>) -> Self {
        log::info!("[MAILBOX] Store initialized");
        SqliteMailboxStore { db }
    }
}

impl MailboxStore for SqliteMailboxStore {
    fn send(
        &self,
        sender: &str,
        recipient: &str,
        content: Value,
        thread_id: &str,
    ) -> Result<(), String> {
        self.db
            .append_mailbox_message(thread_id, sender, recipient, &content)
            .map_err(|e| format!("mailbox append failed: {}", e))
    }

    fn thread(&self, thread_id: &str) -> Result<Vec<MailboxMessage>, String> {
        self.db
            .mailbox_thread(thread_id)
            .map_err(|e| format!("mailbox read failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_appends_to_distinct_threads_stay_ordered() {
        // File-backed so the pool can hand out real concurrent connections
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailbox.db");
        let db = Arc::new(Database::new(path.to_str().unwrap()).unwrap());
        let store = Arc::new(SqliteMailboxStore::new(db));

        let mut handles = Vec::new();
        for t in 0..4 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                let thread_id = format!("thread-{}", t);
                for i in 0..25 {
                    store
                        .send(
                            "executor",
                            "planner",
                            serde_json::json!({"seq": i}),
                            &thread_id,
                        )
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..4 {
            let messages = store.thread(&format!("thread-{}", t)).unwrap();
            assert_eq!(messages.len(), 25);
            for (i, message) in messages.iter().enumerate() {
                assert_eq!(message.content["seq"], i as i64, "thread-{} reordered", t);
            }
        }
    }
}
