//! # Mailbox Relay
//!
//! A store-and-forward messaging relay. Clients register, discover peers, send
//! messages to a peer by identifier and later pull whatever was queued for them.
//!
//! ## Layers
//! - [`core`]: fixed-layout binary framing and payload codecs
//! - [`store`]: the user directory and the per-recipient mailboxes
//! - [`protocol`]: request/response codes and the request router
//! - [`transport`]: TCP listener, one task per single-request connection
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging and metrics
//!
//! ## Example
//! ```rust
//! use mailbox_relay::config::PROTOCOL_VERSION;
//! use mailbox_relay::core::packet::{Request, Response};
//! use mailbox_relay::core::payload::encode_registration_payload;
//! use mailbox_relay::protocol::{ResponseCode, Router};
//!
//! let router = Router::default();
//! let request = Request::new("", PROTOCOL_VERSION, 600, encode_registration_payload("alice", b""));
//! let reply = router.handle_bytes(&request.to_bytes()).unwrap();
//! let response = Response::from_bytes(&reply).unwrap();
//! assert_eq!(response.code, u16::from(ResponseCode::Registered));
//! assert_eq!(response.payload.len(), 16);
//! ```
//!
//! All state is in memory and lost when the process exits.

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod store;
pub mod transport;
pub mod utils;

pub use crate::core::packet::{Request, Response};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::Router;
