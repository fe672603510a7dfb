//! Wire framing.
//!
//! Every numeric field is a big-endian `u32`. A request is `opcode, length, payload`;
//! a response is `status, length, payload`. Every response status carries a length
//! field, possibly zero, so readers can skip statuses they do not know.

use std::io::{self, Read};

use crate::foundation::error::{WorkerError, WorkerResult};
use crate::proto::status::{Opcode, Status};

/// Width of every numeric field on the wire.
pub const FIELD_SIZE: usize = 4;

/// Default upper bound for request payloads (64 MiB).
pub const DEFAULT_MAX_PAYLOAD: u32 = 64 * 1024 * 1024;

/// One decoded request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Operation kind; always [`Opcode::RENDER`] after a successful decode.
    pub opcode: Opcode,
    /// Raw document source.
    pub payload: Vec<u8>,
}

impl Request {
    /// Build a render request for `source`.
    pub fn render(source: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode: Opcode::RENDER,
            payload: source.into(),
        }
    }
}

/// One response frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Outcome classification.
    pub status: Status,
    /// Image bytes, diagnostics, or empty.
    pub payload: Vec<u8>,
}

/// Decode one request using [`DEFAULT_MAX_PAYLOAD`].
///
/// End-of-stream before the opcode is reported as truncation; use [`read_request`] when a
/// clean end-of-stream is an acceptable way to stop.
pub fn decode_request<R: Read>(reader: &mut R) -> WorkerResult<Request> {
    read_request(reader, DEFAULT_MAX_PAYLOAD)?.ok_or_else(|| WorkerError::truncated(FIELD_SIZE, 0))
}

/// Decode one request, or `None` if the stream ended exactly on a frame boundary.
///
/// The opcode is validated before anything else is read.
pub fn read_request<R: Read>(reader: &mut R, max_payload: u32) -> WorkerResult<Option<Request>> {
    let Some(code) = read_u32_or_eof(reader)? else {
        return Ok(None);
    };
    let opcode = Opcode::from_code(code);
    if !opcode.is_supported() {
        return Err(WorkerError::UnsupportedOperation { opcode: code });
    }

    let declared = read_u32(reader)?;
    if declared > max_payload {
        return Err(WorkerError::PayloadTooLarge {
            declared,
            max: max_payload,
        });
    }

    let payload = read_payload(reader, declared)?;
    Ok(Some(Request { opcode, payload }))
}

/// Encode a request. Used by clients and tests.
pub fn encode_request(request: &Request) -> WorkerResult<Vec<u8>> {
    encode_frame(request.opcode.code(), &request.payload)
}

/// Encode a response frame.
pub fn encode_response(frame: &ResponseFrame) -> WorkerResult<Vec<u8>> {
    encode_frame(frame.status.code(), &frame.payload)
}

/// Decode one response frame. Used by clients.
pub fn decode_response<R: Read>(reader: &mut R) -> WorkerResult<ResponseFrame> {
    let status = Status::from_code(read_u32(reader)?);
    let len = read_u32(reader)?;
    let payload = read_payload(reader, len)?;
    Ok(ResponseFrame { status, payload })
}

fn encode_frame(head: u32, payload: &[u8]) -> WorkerResult<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        WorkerError::Other(anyhow::anyhow!(
            "payload of {} bytes does not fit a u32 length field",
            payload.len()
        ))
    })?;
    let mut out = Vec::with_capacity(2 * FIELD_SIZE + payload.len());
    out.extend_from_slice(&head.to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

fn read_payload<R: Read>(reader: &mut R, len: u32) -> WorkerResult<Vec<u8>> {
    let expected = len as usize;
    // Grow with the data actually received instead of trusting the declared length.
    let mut payload = Vec::with_capacity(expected.min(64 * 1024));
    reader
        .by_ref()
        .take(u64::from(len))
        .read_to_end(&mut payload)?;
    if payload.len() != expected {
        return Err(WorkerError::truncated(expected, payload.len()));
    }
    Ok(payload)
}

fn read_u32<R: Read>(reader: &mut R) -> WorkerResult<u32> {
    read_u32_or_eof(reader)?.ok_or_else(|| WorkerError::truncated(FIELD_SIZE, 0))
}

fn read_u32_or_eof<R: Read>(reader: &mut R) -> WorkerResult<Option<u32>> {
    let mut buf = [0u8; FIELD_SIZE];
    let mut filled = 0;
    while filled < FIELD_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(None),
        FIELD_SIZE => Ok(Some(u32::from_be_bytes(buf))),
        n => Err(WorkerError::truncated(FIELD_SIZE, n)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/proto/codec.rs"]
mod tests;
