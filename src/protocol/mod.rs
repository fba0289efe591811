//! # Request Routing
//!
//! Numeric request/response codes and the router that dispatches on them.
//!
//! | request | action | success |
//! |---|---|---|
//! | 600 register | directory `register` | 2100 |
//! | 601 list users | directory `list_excluding` | 2101 |
//! | 602 public key | directory `find_by_id` | 2102 |
//! | 603 send message | mailbox `enqueue` | 2103 |
//! | 604 pull messages | mailbox `drain` | 2104 |
//!
//! Failures answer with 2106 (unknown user), 9000 (unknown request code),
//! 9001 (invalid payload) or 9002 (username taken).

pub mod codes;
pub mod router;

pub use codes::{MessageType, RequestCode, ResponseCode};
pub use router::Router;
