pub mod mailbox;
pub mod memory;

pub use mailbox::MailboxMessage;
pub use memory::MemoryEntry;
