//! Minimal protocol buffers message model
//!
//! Just enough of the protobuf wire format to carry the request envelope:
//! an ordered list of fields, each holding its raw data bytes. Duplicate field
//! numbers are allowed and lookups return the first match.

use crate::decoder::FieldCursor;
use crate::encoder::MessageEncoder;
use crate::error::{CodecResult, ProtocolError};
use crate::varint;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// Fixed 8 bytes
    Fixed64 = 1,
    /// Varint length followed by that many bytes
    LengthDelimited = 2,
    /// Deprecated group start
    StartGroup = 3,
    /// Deprecated group end
    EndGroup = 4,
    /// Fixed 4 bytes
    Fixed32 = 5,
}

impl WireType {
    /// Parse the low three bits of a tag
    #[inline]
    pub fn from_u8(value: u8) -> CodecResult<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(ProtocolError::UnsupportedWireType(other)),
        }
    }
}

/// A single protobuf field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field number (1..=15 for encoding)
    pub number: u32,
    /// Wire type
    pub wire_type: WireType,
    /// Raw data: string bytes, varint bytes or fixed-width bytes
    pub data: Vec<u8>,
}

impl Field {
    /// Length-delimited field holding a string
    pub fn string(number: u32, value: &str) -> Self {
        Self::bytes(number, value.as_bytes())
    }

    /// Length-delimited field holding raw bytes
    pub fn bytes(number: u32, value: &[u8]) -> Self {
        Self {
            number,
            wire_type: WireType::LengthDelimited,
            data: value.to_vec(),
        }
    }

    /// Varint field
    ///
    /// Zero is stored as the single byte 0x00 so the field survives a round trip.
    pub fn varint(number: u32, value: u32) -> Self {
        let mut data = varint::to_bytes(value);
        if data.is_empty() {
            data.push(0);
        }
        Self {
            number,
            wire_type: WireType::Varint,
            data,
        }
    }

    /// Varint field holding 0 or 1
    pub fn boolean(number: u32, value: bool) -> Self {
        Self::varint(number, u32::from(value))
    }

    /// Field data interpreted as UTF-8 text
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Field data interpreted as a varint
    pub fn as_u32(&self) -> CodecResult<u32> {
        varint::decode_at(&self.data, 0).map(|(value, _)| value)
    }

    /// Append this field to the encoder
    pub fn encode_into(&self, encoder: &mut MessageEncoder) -> CodecResult<()> {
        encoder.put_tag(self.number, self.wire_type)?;
        match self.wire_type {
            WireType::LengthDelimited => encoder.put_varbytes(&self.data),
            WireType::Varint if self.data.is_empty() => encoder.put_varint_u32(0),
            WireType::Varint | WireType::Fixed32 => {
                encoder.put_bytes(&self.data);
                Ok(())
            }
            other => Err(ProtocolError::UnsupportedWireType(other as u8)),
        }
    }
}

/// Ordered collection of protobuf fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    /// Create an empty message
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field
    pub fn push(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// All fields in insertion order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// First field with the given number
    pub fn get_field(&self, number: u32) -> Option<&Field> {
        self.fields.iter().find(|field| field.number == number)
    }

    /// Serialize all fields in insertion order
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let capacity = self.fields.iter().map(|f| f.data.len() + 6).sum();
        let mut encoder = MessageEncoder::with_capacity(capacity);
        for field in &self.fields {
            field.encode_into(&mut encoder)?;
        }
        Ok(encoder.finish())
    }

    /// Parse a message
    ///
    /// A truncated field, an unsupported wire type or field number 0 fails the
    /// whole decode.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        let mut cursor = FieldCursor::new(buf);
        let mut fields = Vec::new();

        while !cursor.is_at_end() {
            fields.push(cursor.read_field()?);
        }

        Ok(Self { fields })
    }
}
