//! Frame header structures and utilities
//!
//! Every envelope travels behind an 8-byte header: two magic bytes, two
//! reserved zero bytes and the payload length as a little-endian u32.

use crate::error::{CodecResult, ProtocolError};
use crate::FRAME_MAGIC;

/// Frame header structure (8 bytes, little-endian length)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    /// Payload length in bytes
    pub len: u32,
}

impl FrameHeader {
    /// Header size in bytes (fixed)
    pub const SIZE: usize = 8;

    /// Create a header for a payload of `len` bytes
    #[inline]
    pub fn new(len: u32) -> Self {
        Self { len }
    }

    /// Encode header to bytes
    #[inline]
    pub fn encode(&self, buf: &mut [u8]) -> CodecResult<()> {
        if buf.len() < Self::SIZE {
            return Err(ProtocolError::ShortBuffer);
        }

        buf[0..2].copy_from_slice(&FRAME_MAGIC);
        buf[2..4].fill(0);
        buf[4..8].copy_from_slice(&self.len.to_le_bytes());

        Ok(())
    }

    /// Decode and validate a header
    #[inline]
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        if buf.len() < Self::SIZE {
            return Err(ProtocolError::UnexpectedEof);
        }

        if buf[0..2] != FRAME_MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if buf[2] != 0 || buf[3] != 0 {
            return Err(ProtocolError::ReservedBytes);
        }

        Ok(Self {
            len: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Total frame size including the header
    #[inline]
    pub fn total_size(&self) -> usize {
        Self::SIZE + self.len as usize
    }
}

/// Prefix `payload` with a frame header
pub fn frame(payload: &[u8]) -> CodecResult<Vec<u8>> {
    let len =
        u32::try_from(payload.len()).map_err(|_| ProtocolError::FrameTooLarge(payload.len()))?;
    let mut out = vec![0u8; FrameHeader::SIZE];
    FrameHeader::new(len).encode(&mut out)?;
    out.extend_from_slice(payload);
    Ok(out)
}

/// Validate a header and return the payload length it announces
#[inline]
pub fn unframe(header: &[u8]) -> CodecResult<u32> {
    FrameHeader::decode(header).map(|header| header.len)
}

/// Split a complete frame into its payload
///
/// Fails with `UnexpectedEof` when fewer bytes than announced are present.
pub fn payload(frame: &[u8]) -> CodecResult<&[u8]> {
    let header = FrameHeader::decode(frame)?;
    frame
        .get(FrameHeader::SIZE..header.total_size())
        .ok_or(ProtocolError::UnexpectedEof)
}
