//! # Error Types
//!
//! Error handling for the relay protocol.
//!
//! This module defines every error variant that can occur while framing, decoding
//! and routing a request, from low-level I/O failures up to directory conflicts.
//!
//! ## Error Categories
//! - **Decode Errors**: truncated headers or payloads, oversized frames. The
//!   connection is closed without a reply.
//! - **Validation Errors**: well-formed but semantically invalid payloads
//! - **Directory Errors**: duplicate usernames, unknown users
//! - **Routing Errors**: unrecognised request codes
//! - **I/O / Config Errors**: socket, file and configuration failures
//!
//! Errors never cross the single request-handling cycle: the router turns every
//! payload, directory and routing error into a response code, and the transport
//! closes the connection on decode and I/O errors.
//!
//! ## Example Usage
//! ```rust
//! use mailbox_relay::error::{ProtocolError, Result};
//! use mailbox_relay::core::packet::decode_header;
//!
//! fn requester(bytes: &[u8]) -> Result<String> {
//!     let header = decode_header(bytes)?;
//!     Ok(header.client_id_hex())
//! }
//!
//! assert!(matches!(requester(&[0u8; 3]), Err(ProtocolError::InvalidHeader)));
//! ```

use std::io;
use thiserror::Error;

/// Reason strings carried in error payloads.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Sent with response 2106
    pub const ERR_USER_NOT_FOUND: &str = "User does not exist";
    /// Sent with response 9002
    pub const ERR_USERNAME_TAKEN: &str = "Username already exists";

    /// Payload validation errors
    pub const ERR_INVALID_PAYLOAD: &str = "Invalid payload";
    pub const ERR_MISSING_USERNAME: &str = "Missing username";
    pub const ERR_USERNAME_NOT_UTF8: &str = "Username is not valid UTF-8";
    pub const ERR_INVALID_CLIENT_ID: &str = "Client id is not a valid ASCII identifier";
}

/// ProtocolError is the primary error type for all relay operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Fewer than 23 bytes were available for the request header
    #[error("Invalid protocol header")]
    InvalidHeader,

    #[error("Truncated payload: {0}")]
    TruncatedPayload(String),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Unknown request code: {0}")]
    UnknownRequestCode(u16),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
