//! Request payload decoders and response payload builders.
//!
//! Every builder is a pure function of its input; none performs I/O. The
//! client-side encoders and parsers at the bottom of the module mirror the
//! server-side layouts and are used by the TCP client helper and the tests.

use crate::core::wire::{self, ID_FIELD_SIZE, PUBLIC_KEY_FIELD_SIZE, USERNAME_FIELD_SIZE};
use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, BufMut};

/// Fixed prefix of a send-message payload: recipient id, message type, content size
pub const MESSAGE_PREFIX_SIZE: usize = ID_FIELD_SIZE + 1 + 4;

/// Fixed part of one record in a pull-messages batch
pub const MESSAGE_RECORD_PREFIX_SIZE: usize = ID_FIELD_SIZE + 4 + 1 + 4;

/// Size of one record in a user-list response
pub const USER_RECORD_SIZE: usize = ID_FIELD_SIZE + USERNAME_FIELD_SIZE;

/// Decoded registration request (code 600)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    /// `None` when the key was empty or its declared length ran past the buffer
    pub public_key: Option<Vec<u8>>,
}

/// Decoded send-message request (code 603)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub recipient_id: String,
    pub message_type: u8,
    pub content: Vec<u8>,
}

/// Borrowed view of a queued message, as laid out in a 2104 batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRecord<'a> {
    pub sender_id: &'a str,
    pub message_id: u32,
    pub message_type: u8,
    pub content: &'a [u8],
}

/// Owned message record parsed back out of a 2104 batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub sender_id: String,
    pub message_id: u32,
    pub message_type: u8,
    pub content: Vec<u8>,
}

/// Decode `[name_len][username][key_len][public_key]`.
///
/// A buffer too short for the username or the key-length byte is an error. A
/// key whose declared length runs past the buffer is dropped, not rejected.
pub fn decode_registration_payload(bytes: &[u8]) -> Result<Registration> {
    let Some((&name_len, rest)) = bytes.split_first() else {
        return Err(ProtocolError::TruncatedPayload(
            "registration payload is empty".to_string(),
        ));
    };
    let name_len = name_len as usize;
    if rest.len() < name_len + 1 {
        return Err(ProtocolError::TruncatedPayload(format!(
            "registration payload needs {} bytes, got {}",
            name_len + 2,
            bytes.len()
        )));
    }

    let username = std::str::from_utf8(&rest[..name_len])
        .map_err(|_| ProtocolError::Validation(constants::ERR_USERNAME_NOT_UTF8.to_string()))?
        .to_string();

    let key_len = rest[name_len] as usize;
    let key_bytes = &rest[name_len + 1..];
    let public_key = if key_len == 0 || key_bytes.len() < key_len {
        None
    } else {
        Some(key_bytes[..key_len].to_vec())
    };

    Ok(Registration {
        username,
        public_key,
    })
}

/// Decode `[recipient_id:16][message_type:1][content_size:4][content]`.
pub fn decode_message_payload(bytes: &[u8]) -> Result<OutgoingMessage> {
    if bytes.len() < MESSAGE_PREFIX_SIZE {
        return Err(ProtocolError::TruncatedPayload(format!(
            "message payload needs at least {MESSAGE_PREFIX_SIZE} bytes, got {}",
            bytes.len()
        )));
    }

    let recipient_id = wire::decode_ascii_id_lossy(&bytes[..ID_FIELD_SIZE]);

    let mut buf = &bytes[ID_FIELD_SIZE..];
    let message_type = buf.get_u8();
    let content_size = buf.get_u32() as usize;
    if buf.remaining() < content_size {
        return Err(ProtocolError::TruncatedPayload(format!(
            "message content declares {content_size} bytes, {} present",
            buf.remaining()
        )));
    }

    Ok(OutgoingMessage {
        recipient_id,
        message_type,
        content: buf[..content_size].to_vec(),
    })
}

/// Decode a public-key lookup (code 602): `[user_id:16]`.
pub fn decode_public_key_request(bytes: &[u8]) -> Result<String> {
    if bytes.len() < ID_FIELD_SIZE {
        return Err(ProtocolError::TruncatedPayload(format!(
            "public key request needs {ID_FIELD_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(wire::decode_ascii_id_lossy(&bytes[..ID_FIELD_SIZE]))
}

/// 2100: the new user's id in a 16-byte field.
pub fn build_registration_success(user_id: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(ID_FIELD_SIZE);
    wire::put_id(&mut out, user_id);
    out
}

/// 2101: one `[user_id:16][username:255]` record per user.
pub fn build_user_list<'a, I>(users: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = Vec::new();
    for (user_id, username) in users {
        wire::put_id(&mut out, user_id);
        wire::put_username(&mut out, username);
    }
    out
}

/// 2102: `[user_id:16][public_key:160]`, all-zero key when none was registered.
pub fn build_public_key(user_id: &str, public_key: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::with_capacity(ID_FIELD_SIZE + PUBLIC_KEY_FIELD_SIZE);
    wire::put_id(&mut out, user_id);
    wire::put_fixed(&mut out, public_key.unwrap_or_default(), PUBLIC_KEY_FIELD_SIZE);
    out
}

/// 2103: `[recipient_id:16][message_id:4]`.
pub fn build_send_ack(recipient_id: &str, message_id: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(ID_FIELD_SIZE + 4);
    wire::put_id(&mut out, recipient_id);
    out.put_u32(message_id);
    out
}

/// 2104: concatenated message records, empty when nothing was queued.
pub fn build_message_batch<'a, I>(messages: I) -> Vec<u8>
where
    I: IntoIterator<Item = MessageRecord<'a>>,
{
    let mut out = Vec::new();
    for msg in messages {
        wire::put_id(&mut out, msg.sender_id);
        out.put_u32(msg.message_id);
        out.put_u8(msg.message_type);
        out.put_u32(msg.content.len() as u32);
        out.put_slice(msg.content);
    }
    out
}

/// Error payloads (2106, 9001, 9002): UTF-8 reason text with no further layout.
pub fn build_error_text(reason: &str) -> Vec<u8> {
    reason.as_bytes().to_vec()
}

/// Client side of code 600.
pub fn encode_registration_payload(username: &str, public_key: &[u8]) -> Vec<u8> {
    let name = wire::truncate_utf8(username, u8::MAX as usize);
    let key = &public_key[..public_key.len().min(u8::MAX as usize)];
    let mut out = Vec::with_capacity(2 + name.len() + key.len());
    out.put_u8(name.len() as u8);
    out.put_slice(name.as_bytes());
    out.put_u8(key.len() as u8);
    out.put_slice(key);
    out
}

/// Client side of code 603.
pub fn encode_message_payload(recipient_id: &str, message_type: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(MESSAGE_PREFIX_SIZE + content.len());
    wire::put_id(&mut out, recipient_id);
    out.put_u8(message_type);
    out.put_u32(content.len() as u32);
    out.put_slice(content);
    out
}

/// Parse a 2101 payload into `(user_id, username)` pairs.
pub fn parse_user_list(payload: &[u8]) -> Result<Vec<(String, String)>> {
    if payload.len() % USER_RECORD_SIZE != 0 {
        return Err(ProtocolError::TruncatedPayload(format!(
            "user list of {} bytes is not a whole number of records",
            payload.len()
        )));
    }
    Ok(payload
        .chunks_exact(USER_RECORD_SIZE)
        .map(|record| {
            let id = wire::decode_nul_terminated(&record[..ID_FIELD_SIZE]);
            let name = wire::decode_nul_terminated(&record[ID_FIELD_SIZE..]);
            (id, name)
        })
        .collect())
}

/// Parse a 2104 payload into its message records.
pub fn parse_message_batch(payload: &[u8]) -> Result<Vec<DeliveredMessage>> {
    let mut buf = payload;
    let mut messages = Vec::new();
    while buf.has_remaining() {
        if buf.remaining() < MESSAGE_RECORD_PREFIX_SIZE {
            return Err(ProtocolError::TruncatedPayload(
                "message record header cut short".to_string(),
            ));
        }
        let sender_id = wire::decode_nul_terminated(&buf[..ID_FIELD_SIZE]);
        buf.advance(ID_FIELD_SIZE);
        let message_id = buf.get_u32();
        let message_type = buf.get_u8();
        let content_size = buf.get_u32() as usize;
        if buf.remaining() < content_size {
            return Err(ProtocolError::TruncatedPayload(
                "message record content cut short".to_string(),
            ));
        }
        let content = buf[..content_size].to_vec();
        buf.advance(content_size);
        messages.push(DeliveredMessage {
            sender_id,
            message_id,
            message_type,
            content,
        });
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn registration_with_key() {
        let payload = encode_registration_payload("alice", b"KEY");
        let reg = decode_registration_payload(&payload).unwrap();
        assert_eq!(reg.username, "alice");
        assert_eq!(reg.public_key.as_deref(), Some(&b"KEY"[..]));
    }

    #[test]
    fn registration_truncated_key_is_dropped() {
        let mut payload = vec![3];
        payload.extend_from_slice(b"bob");
        payload.push(10); // declares 10 key bytes
        payload.extend_from_slice(b"abc");
        let reg = decode_registration_payload(&payload).unwrap();
        assert_eq!(reg.username, "bob");
        assert_eq!(reg.public_key, None);
    }

    #[test]
    fn registration_missing_key_length_is_an_error() {
        let mut payload = vec![3];
        payload.extend_from_slice(b"bob");
        assert!(matches!(
            decode_registration_payload(&payload),
            Err(ProtocolError::TruncatedPayload(_))
        ));
        assert!(matches!(
            decode_registration_payload(&[]),
            Err(ProtocolError::TruncatedPayload(_))
        ));
    }

    #[test]
    fn registration_rejects_invalid_utf8_name() {
        let payload = [2, 0xC3, 0x28, 0];
        assert!(matches!(
            decode_registration_payload(&payload),
            Err(ProtocolError::Validation(_))
        ));
    }

    #[test]
    fn message_payload_layout() {
        let payload = encode_message_payload("bob", 3, b"hi");
        assert_eq!(payload.len(), MESSAGE_PREFIX_SIZE + 2);
        let msg = decode_message_payload(&payload).unwrap();
        assert_eq!(msg.recipient_id, "bob");
        assert_eq!(msg.message_type, 3);
        assert_eq!(msg.content, b"hi");
    }

    #[test]
    fn message_payload_content_overrun() {
        let mut payload = encode_message_payload("bob", 3, b"hello");
        payload.truncate(payload.len() - 1);
        assert!(matches!(
            decode_message_payload(&payload),
            Err(ProtocolError::TruncatedPayload(_))
        ));
        assert!(decode_message_payload(&payload[..20]).is_err());
    }

    #[test]
    fn batch_is_concatenated_records() {
        let batch = build_message_batch([
            MessageRecord {
                sender_id: "a",
                message_id: 7,
                message_type: 3,
                content: b"one",
            },
            MessageRecord {
                sender_id: "b",
                message_id: 8,
                message_type: 4,
                content: b"",
            },
        ]);
        assert_eq!(batch.len(), 2 * MESSAGE_RECORD_PREFIX_SIZE + 3);
        let parsed = parse_message_batch(&batch).unwrap();
        assert_eq!(parsed[0].sender_id, "a");
        assert_eq!(parsed[0].content, b"one");
        assert_eq!(parsed[1].message_id, 8);
        assert!(parsed[1].content.is_empty());
    }

    #[test]
    fn public_key_field_is_fixed_width() {
        assert_eq!(build_public_key("u", None).len(), ID_FIELD_SIZE + PUBLIC_KEY_FIELD_SIZE);
        let long_key = vec![7u8; 300];
        let out = build_public_key("u", Some(&long_key));
        assert_eq!(out.len(), ID_FIELD_SIZE + PUBLIC_KEY_FIELD_SIZE);
        assert!(out[ID_FIELD_SIZE..].iter().all(|&b| b == 7));
    }
}
