//! Store interfaces consumed by the agents.
//!
//! Both stores are append-only logs. The traits keep the backing medium
//! swappable without touching orchestration logic; the shipped backend is
//! SQLite via [`crate::db::Database`].

pub mod mailbox;
pub mod memory;

pub use mailbox::{MailboxStore, SqliteMailboxStore};
pub use memory::{MemoryStore, SqliteMemoryStore};
