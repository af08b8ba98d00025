//! Protobuf message encoder
//!
//! Appends tags, varints and length-prefixed byte strings to an owned buffer.
//! Only the single-byte tag form is produced, which limits field numbers to 15.

use crate::error::{CodecResult, ProtocolError};
use crate::protobuf::WireType;
use crate::varint;

/// Largest field number that fits the single tag byte
pub const MAX_FIELD_NUMBER: u32 = 15;

/// Encoder writing protobuf fields into a growable buffer
#[derive(Debug, Default)]
pub struct MessageEncoder {
    buf: Vec<u8>,
}

impl MessageEncoder {
    /// Create an empty encoder
    #[inline]
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create an encoder with preallocated capacity
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Write a field tag `(field_number << 3) | wire_type`
    #[inline]
    pub fn put_tag(&mut self, field_number: u32, wire_type: WireType) -> CodecResult<()> {
        if field_number == 0 || field_number > MAX_FIELD_NUMBER {
            return Err(ProtocolError::FieldNumberOutOfRange(field_number));
        }
        self.buf.push(((field_number as u8) << 3) | wire_type as u8);
        Ok(())
    }

    /// Write a varint-encoded u32
    #[inline]
    pub fn put_varint_u32(&mut self, value: u32) -> CodecResult<()> {
        let mut scratch = [0u8; varint::MAX_VARINT_U32_SIZE];
        let len = varint::encode_u32(value, &mut scratch)?;
        self.buf.extend_from_slice(&scratch[..len]);
        Ok(())
    }

    /// Write variable-length bytes with a varint length prefix
    #[inline]
    pub fn put_varbytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| ProtocolError::FrameTooLarge(bytes.len()))?;
        self.put_varint_u32(len)?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Write raw bytes without length prefix
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish encoding and take the buffer
    #[inline]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_layout() {
        let mut encoder = MessageEncoder::new();
        encoder.put_tag(1, WireType::LengthDelimited).unwrap();
        encoder.put_tag(2, WireType::Varint).unwrap();
        encoder.put_tag(15, WireType::Fixed32).unwrap();
        assert_eq!(encoder.finish(), vec![0x0A, 0x10, 0x7D]);
    }

    #[test]
    fn test_field_number_limit() {
        let mut encoder = MessageEncoder::new();
        assert_eq!(
            encoder.put_tag(16, WireType::Varint),
            Err(ProtocolError::FieldNumberOutOfRange(16))
        );
        assert!(encoder.is_empty());
    }

    #[test]
    fn test_varbytes() {
        let mut encoder = MessageEncoder::with_capacity(16);
        encoder.put_varbytes(b"abc").unwrap();
        encoder.put_varbytes(b"").unwrap();
        assert_eq!(encoder.len(), 5);
        assert_eq!(encoder.finish(), vec![0x03, b'a', b'b', b'c', 0x00]);
    }

    #[test]
    fn test_long_varbytes_prefix() {
        let body = vec![b'x'; 300];
        let mut encoder = MessageEncoder::new();
        encoder.put_varbytes(&body).unwrap();
        let out = encoder.finish();
        assert_eq!(&out[..2], &[0xAC, 0x02]);
        assert_eq!(out.len(), 302);
    }
}
