//! # Relay State
//!
//! The two shared stores every connection worker reads and mutates.
//!
//! - **Directory**: registered users and identifier generation
//! - **Mailbox**: per-recipient queues of undelivered messages
//!
//! Each store serialises access behind its own lock. Neither holds references
//! into the other; they are joined by identifier value only.

pub mod directory;
pub mod mailbox;

pub use directory::{User, UserDirectory, UserSummary};
pub use mailbox::{MailboxStore, StoredMessage};
