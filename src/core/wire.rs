//! Fixed-width field encoding shared by every payload layout.
//!
//! Identifiers travel as 16-byte fields, usernames as 255-byte NUL-terminated
//! fields and public keys as 160-byte fields. Oversized values are truncated and
//! short values are NUL-padded; nothing here rejects input.

use bytes::BufMut;

/// Width of every identifier field (client id, user id, sender, recipient)
pub const ID_FIELD_SIZE: usize = 16;

/// Width of the username field in a user-list record
pub const USERNAME_FIELD_SIZE: usize = 255;

/// Width of the public-key field in a public-key response
pub const PUBLIC_KEY_FIELD_SIZE: usize = 160;

/// Write `bytes` into a field of exactly `width` bytes, truncating or NUL-padding.
pub fn put_fixed<B: BufMut>(buf: &mut B, bytes: &[u8], width: usize) {
    let take = bytes.len().min(width);
    buf.put_slice(&bytes[..take]);
    buf.put_bytes(0, width - take);
}

/// Write an identifier into a 16-byte field.
#[inline]
pub fn put_id<B: BufMut>(buf: &mut B, id: &str) {
    put_fixed(buf, id.as_bytes(), ID_FIELD_SIZE);
}

/// Write a username into a 255-byte field, always leaving room for the NUL terminator.
///
/// Names longer than 254 bytes are cut back to the nearest character boundary so
/// the field never carries a partial UTF-8 sequence.
pub fn put_username<B: BufMut>(buf: &mut B, username: &str) {
    let name = truncate_utf8(username, USERNAME_FIELD_SIZE - 1);
    put_fixed(buf, name.as_bytes(), USERNAME_FIELD_SIZE);
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a character.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Decode an identifier field as ASCII with trailing NUL bytes stripped.
///
/// Returns `None` when the remaining bytes are not ASCII.
pub fn decode_ascii_id(field: &[u8]) -> Option<String> {
    let end = field
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    let trimmed = &field[..end];
    if trimmed.is_ascii() {
        // ASCII is always valid UTF-8
        Some(trimmed.iter().map(|&b| char::from(b)).collect())
    } else {
        None
    }
}

/// Decode an identifier that is only ever looked up, never stored.
///
/// Non-ASCII bytes are dropped before trailing NULs are stripped, so a garbled
/// id becomes one that matches no registered user.
pub fn decode_ascii_id_lossy(field: &[u8]) -> String {
    let ascii: Vec<u8> = field.iter().copied().filter(u8::is_ascii).collect();
    let end = ascii.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
    ascii[..end].iter().map(|&b| char::from(b)).collect()
}

/// Read a NUL-terminated string out of a fixed field.
pub fn decode_nul_terminated(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
