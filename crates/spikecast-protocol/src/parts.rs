//! Multi-part message framing.
//!
//! An event travels as one logical message split into ordered, named byte
//! buffers. On the wire each part is a 5-byte header (`flags: u8`,
//! `len: u32` little-endian) followed by the payload; bit 0 of the flags
//! marks "more parts follow", so a subscriber reassembles the message by
//! reading parts until the flag clears. Part names never reach the wire -
//! they exist for diagnostics and error reporting.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Maximum size of a single message part (16 MiB).
pub const MAX_PART_SIZE: usize = 16 * 1024 * 1024;

/// Per-part wire header size in bytes.
pub const PART_HEADER_SIZE: usize = 5;

/// Flag bit marking that more parts of the same message follow.
pub const PART_MORE: u8 = 0x01;

/// Part-level framing errors.
#[derive(Debug, Error)]
pub enum PartError {
    /// Part payload exceeds the maximum size.
    #[error("Part size {0} exceeds maximum {MAX_PART_SIZE}")]
    TooLarge(usize),
}

/// A named byte buffer making up one part of an outgoing message.
#[derive(Debug, Clone)]
pub struct MsgPart {
    /// Diagnostic name ("type", "data", "json").
    pub name: &'static str,
    /// Payload bytes.
    pub data: Bytes,
}

impl MsgPart {
    /// Create a new part.
    #[must_use]
    pub fn new(name: &'static str, data: impl Into<Bytes>) -> Self {
        Self {
            name,
            data: data.into(),
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Append one framed part to a wire buffer.
///
/// # Errors
///
/// Returns an error if the payload exceeds [`MAX_PART_SIZE`].
pub fn write_part(buf: &mut BytesMut, payload: &[u8], more: bool) -> Result<(), PartError> {
    if payload.len() > MAX_PART_SIZE {
        return Err(PartError::TooLarge(payload.len()));
    }

    buf.reserve(PART_HEADER_SIZE + payload.len());
    buf.put_u8(if more { PART_MORE } else { 0 });
    buf.put_u32_le(payload.len() as u32);
    buf.extend_from_slice(payload);

    Ok(())
}

/// Try to read one part from a buffer, advancing it on success.
///
/// Returns the payload and whether more parts of the same message follow,
/// or `None` when the buffer does not yet hold a complete part.
pub fn read_part(buf: &mut BytesMut) -> Option<(Bytes, bool)> {
    if buf.len() < PART_HEADER_SIZE {
        return None;
    }

    let flags = buf[0];
    let length = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;

    if buf.len() < PART_HEADER_SIZE + length {
        return None;
    }

    buf.advance(PART_HEADER_SIZE);
    let payload = buf.split_to(length).freeze();

    Some((payload, flags & PART_MORE != 0))
}
