//! Zero-copy protobuf field cursor
//!
//! The cursor operates on a borrowed slice and hands out sub-slices for
//! length-delimited data.

use crate::error::{CodecResult, ProtocolError};
use crate::protobuf::{Field, WireType};
use crate::varint;

/// Cursor for reading protobuf content with position tracking
#[derive(Debug)]
pub struct FieldCursor<'a> {
    /// Buffer containing the message
    pub buf: &'a [u8],
    /// Current read position
    pub pos: usize,
}

impl<'a> FieldCursor<'a> {
    /// Create a cursor at the start of `buf`
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Get remaining bytes in cursor
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Check if cursor is at end
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read a single byte
    #[inline]
    pub fn get_u8(&mut self) -> CodecResult<u8> {
        let value = *self.buf.get(self.pos).ok_or(ProtocolError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    /// Read a varint-encoded u32
    #[inline]
    pub fn get_varint_u32(&mut self) -> CodecResult<u32> {
        let (value, varint_size) = varint::decode_u32(&self.buf[self.pos..])?;
        self.pos += varint_size;
        Ok(value)
    }

    /// Read raw bytes without length prefix
    #[inline]
    pub fn get_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(ProtocolError::UnexpectedEof)?;
        if end > self.buf.len() {
            return Err(ProtocolError::UnexpectedEof);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read variable-length bytes with length prefix
    #[inline]
    pub fn get_varbytes(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.get_varint_u32()? as usize;
        self.get_bytes(len)
    }

    /// Read the next complete field
    ///
    /// A varint field keeps its encoded bytes as data. Groups and 64-bit
    /// fields are rejected with `UnsupportedWireType`, field number 0 with
    /// `FieldNumberOutOfRange`.
    pub fn read_field(&mut self) -> CodecResult<Field> {
        let tag = self.get_u8()?;
        let number = u32::from(tag >> 3);
        if number == 0 {
            return Err(ProtocolError::FieldNumberOutOfRange(0));
        }
        let wire_type = WireType::from_u8(tag & 0x07)?;

        let data = match wire_type {
            WireType::Varint => {
                let value_start = self.pos;
                self.get_varint_u32()?;
                self.buf[value_start..self.pos].to_vec()
            }
            WireType::LengthDelimited => self.get_varbytes()?.to_vec(),
            WireType::Fixed32 => self.get_bytes(4)?.to_vec(),
            other => return Err(ProtocolError::UnsupportedWireType(other as u8)),
        };

        Ok(Field {
            number,
            wire_type,
            data,
        })
    }
}
