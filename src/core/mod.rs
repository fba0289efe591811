//! # Core Protocol Components
//!
//! Low-level packet handling, codecs, and fixed-width field encoding.
//!
//! This module provides the foundation for the relay, handling request framing,
//! header encoding/decoding, and the per-request-code payload layouts.
//!
//! ## Components
//! - **Wire**: fixed-width id / username / key fields
//! - **Packet**: request and response headers
//! - **Payload**: request payload decoders and response payload builders
//! - **Codec**: Tokio codec framing one request out of a byte stream
//!
//! ## Wire Format
//! ```text
//! request:  [ClientId(16)] [Version(1)] [Code(2)] [PayloadSize(4)] [Payload(N)]
//! response: [Version(1)] [Code(2)] [PayloadSize(4)] [Payload(N)]
//! ```
//!
//! All integers are big-endian. Nothing in this module performs I/O.

pub mod codec;
pub mod packet;
pub mod payload;
pub mod wire;
