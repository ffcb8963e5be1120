//! Inter-agent mailbox database operations (mailbox_messages)

use chrono::Utc;
use rusqlite::Result as SqliteResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::super::Database;

/// One immutable message in a multi-agent thread.
/// Messages are never updated or deleted; a thread's history is a total
/// order by insertion, which makes a run replayable after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxMessage {
    pub id: i64,
    pub thread_id: String,
    pub sender: String,
    pub recipient: String,
    pub content: Value,
    pub timestamp: String,
}

impl Database {
    /// Append one message to a thread
    pub fn append_mailbox_message(
        &self,
        thread_id: &str,
        sender: &str,
        recipient: &str,
        content: &Value,
    ) -> SqliteResult<()> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO mailbox_messages (thread_id, sender, recipient, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![thread_id, sender, recipient, content.to_string(), &now],
        )?;

        log::info!(
            "[MAILBOX] Message saved: thread={} sender={} recipient={}",
            thread_id,
            sender,
            recipient
        );
        Ok(())
    }

    /// All messages for one thread, in insertion order
    pub fn mailbox_thread(&self, thread_id: &str) -> SqliteResult<Vec<MailboxMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, thread_id, sender, recipient, content, created_at
             FROM mailbox_messages WHERE thread_id = ?1 ORDER BY id ASC",
        )?;

        let messages = stmt
            .query_map([thread_id], |row| {
                let raw: String = row.get(4)?;
                Ok(MailboxMessage {
                    id: row.get(0)?,
                    thread_id: row.get(1)?,
                    sender: row.get(2)?,
                    recipient: row.get(3)?,
                    content: serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
                    timestamp: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_reads_back_in_insertion_order() {
        let db = Database::new_in_memory().unwrap();
        let thread = "t-1";
        db.append_mailbox_message(thread, "user", "planner", &serde_json::json!({"prompt": "x"}))
            .unwrap();
        db.append_mailbox_message(thread, "planner", "executor", &serde_json::json!({"plan": "1) y"}))
            .unwrap();
        db.append_mailbox_message(thread, "executor", "planner", &serde_json::json!({"result": "z"}))
            .unwrap();

        let messages = db.mailbox_thread(thread).unwrap();
        let senders: Vec<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
        assert_eq!(senders, vec!["user", "planner", "executor"]);
        assert_eq!(messages[1].content["plan"], "1) y");
    }

    #[test]
    fn test_threads_are_isolated() {
        let db = Database::new_in_memory().unwrap();
        db.append_mailbox_message("a", "user", "planner", &serde_json::json!({}))
            .unwrap();
        db.append_mailbox_message("b", "user", "planner", &serde_json::json!({}))
            .unwrap();

        assert_eq!(db.mailbox_thread("a").unwrap().len(), 1);
        assert_eq!(db.mailbox_thread("b").unwrap().len(), 1);
        assert!(db.mailbox_thread("missing").unwrap().is_empty());
    }

    #[test]
    fn test_rereading_thread_is_idempotent() {
        let db = Database::new_in_memory().unwrap();
        db.append_mailbox_message("t", "user", "planner", &serde_json::json!({"prompt": "p"}))
            .unwrap();
        db.append_mailbox_message("t", "planner", "user", &serde_json::json!({"final": "f"}))
            .unwrap();

        let first = db.mailbox_thread("t").unwrap();
        let second = db.mailbox_thread("t").unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.content, b.content);
        }
    }
}
