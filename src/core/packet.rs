use crate::core::wire::{self, ID_FIELD_SIZE};
use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, BufMut};

/// Size of the request header: client id, version, request code, payload size
pub const HEADER_SIZE: usize = ID_FIELD_SIZE + 1 + 2 + 4;

/// Size of the response header: version, response code, payload size
pub const RESPONSE_HEADER_SIZE: usize = 1 + 2 + 4;

/// Largest payload a response header can describe
pub const MAX_RESPONSE_PAYLOAD: usize = u32::MAX as usize;

/// Fixed 23-byte header that prefixes every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Raw requester identifier, NUL-padded
    pub client_id: [u8; ID_FIELD_SIZE],
    pub version: u8,
    pub request_code: u16,
    /// Number of payload bytes following the header
    pub payload_size: u32,
}

impl RequestHeader {
    /// Build a header for `client_id`, padding or truncating it to 16 bytes.
    pub fn new(client_id: &str, version: u8, request_code: u16, payload_size: u32) -> Self {
        let mut field = [0u8; ID_FIELD_SIZE];
        wire::put_id(&mut &mut field[..], client_id);
        Self {
            client_id: field,
            version,
            request_code,
            payload_size,
        }
    }

    /// Hex rendering of the raw client id, used for logging.
    pub fn client_id_hex(&self) -> String {
        hex::encode(self.client_id)
    }

    /// The requester's identifier as ASCII with trailing NULs stripped.
    pub fn requester_id(&self) -> Result<String> {
        wire::decode_ascii_id(&self.client_id)
            .ok_or_else(|| ProtocolError::Validation(constants::ERR_INVALID_CLIENT_ID.to_string()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.put_slice(&self.client_id);
        out.put_u8(self.version);
        out.put_u16(self.request_code);
        out.put_u32(self.payload_size);
        out
    }
}

/// Decode the request header from the front of `bytes`.
///
/// Neither the version nor the request code is validated here; unknown codes
/// are the router's concern.
pub fn decode_header(bytes: &[u8]) -> Result<RequestHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InvalidHeader);
    }

    let mut buf = &bytes[..HEADER_SIZE];
    let mut client_id = [0u8; ID_FIELD_SIZE];
    buf.copy_to_slice(&mut client_id);

    Ok(RequestHeader {
        client_id,
        version: buf.get_u8(),
        request_code: buf.get_u16(),
        payload_size: buf.get_u32(),
    })
}

/// A decoded request: header plus the payload bytes it declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub header: RequestHeader,
    pub payload: Vec<u8>,
}

impl Request {
    /// Build a request whose header declares exactly `payload.len()` bytes.
    pub fn new(client_id: &str, version: u8, request_code: u16, payload: Vec<u8>) -> Self {
        let header = RequestHeader::new(client_id, version, request_code, payload.len() as u32);
        Self { header, payload }
    }

    /// Split a raw buffer into header and payload.
    ///
    /// Bytes beyond `payload_size` are ignored. A buffer holding fewer payload
    /// bytes than declared yields the bytes that are present; the payload
    /// decoders then report the truncation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = decode_header(bytes)?;
        let body = &bytes[HEADER_SIZE..];
        let take = body.len().min(header.payload_size as usize);
        Ok(Self {
            header,
            payload: body[..take].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.header.to_bytes();
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Seven-byte response header. It carries no client id: the connection is the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub version: u8,
    pub code: u16,
    pub payload_size: u32,
}

/// A response ready for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub version: u8,
    pub code: u16,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(version: u8, code: u16, payload: Vec<u8>) -> Self {
        Self {
            version,
            code,
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_response(self.version, self.code, &self.payload)
    }

    /// Parse a response as a client would, requiring the full declared payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = decode_response_header(bytes)?;
        let needed = RESPONSE_HEADER_SIZE + header.payload_size as usize;
        if bytes.len() < needed {
            return Err(ProtocolError::TruncatedPayload(format!(
                "response declares {} payload bytes, {} present",
                header.payload_size,
                bytes.len() - RESPONSE_HEADER_SIZE
            )));
        }
        Ok(Self {
            version: header.version,
            code: header.code,
            payload: bytes[RESPONSE_HEADER_SIZE..needed].to_vec(),
        })
    }
}

/// Encode a response: 7-byte header followed by `payload`.
pub fn encode_response(version: u8, code: u16, payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
    put_response(&mut out, version, code, payload)?;
    Ok(out)
}

/// Write a response into `dst`. Nothing is written when the payload is too
/// large for the 32-bit size field.
pub fn put_response<B: BufMut>(
    dst: &mut B,
    version: u8,
    code: u16,
    payload: &[u8],
) -> Result<()> {
    let payload_size = response_payload_size(payload.len())?;
    dst.put_u8(version);
    dst.put_u16(code);
    dst.put_u32(payload_size);
    dst.put_slice(payload);
    Ok(())
}

/// The value of the response `payload_size` field for a payload of `len` bytes.
pub fn response_payload_size(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ProtocolError::OversizedPacket(len))
}

pub fn decode_response_header(bytes: &[u8]) -> Result<ResponseHeader> {
    if bytes.len() < RESPONSE_HEADER_SIZE {
        return Err(ProtocolError::InvalidHeader);
    }
    let mut buf = &bytes[..RESPONSE_HEADER_SIZE];
    Ok(ResponseHeader {
        version: buf.get_u8(),
        code: buf.get_u16(),
        payload_size: buf.get_u32(),
    })
}
