use crate::config::DEFAULT_MAX_REQUEST_SIZE;
use crate::core::packet::{
    decode_header, put_response, Request, Response, HEADER_SIZE, RESPONSE_HEADER_SIZE,
};
use crate::error::ProtocolError;
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

/// Frames requests out of a byte stream and writes responses back.
///
/// A request is complete once the 23-byte header and the `payload_size` bytes it
/// declares have arrived. Declared sizes above `max_request_size` are refused
/// before anything is allocated for them.
#[derive(Debug, Clone, Copy)]
pub struct RequestCodec {
    max_request_size: usize,
}

impl RequestCodec {
    pub fn new(max_request_size: usize) -> Self {
        Self { max_request_size }
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUEST_SIZE)
    }
}

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let header = decode_header(src)?;
        let payload_size = header.payload_size as usize;
        if payload_size > self.max_request_size {
            return Err(ProtocolError::OversizedPacket(payload_size));
        }

        let total = HEADER_SIZE + payload_size;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total);
        Request::from_bytes(&frame).map(Some)
    }
}

impl Encoder<Response> for RequestCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(RESPONSE_HEADER_SIZE + item.payload.len());
        put_response(dst, item.version, item.code, &item.payload)
    }
}
