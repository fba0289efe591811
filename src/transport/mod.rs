//! # Transport Layer
//!
//! TCP listener and the per-connection request cycle.
//!
//! Each accepted connection runs in its own tokio task and carries exactly one
//! request/response exchange: the worker frames a request, hands it to the
//! [`Router`](crate::protocol::Router), writes the reply and closes. Only the
//! initial read and the final write suspend.
//!
//! Reads have no deadline. A client that connects and never finishes its request
//! pins a task until it disconnects; worker count is unbounded.

pub mod tcp;

pub use tcp::{bind, exchange, handle_connection, request, serve, start_server};
