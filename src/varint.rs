//! Variable-length integer encoding
//!
//! Unsigned 32-bit integers are written as little-endian groups of 7 bits, with
//! the high bit set on every byte except the last. The server uses this encoding
//! for protobuf tags, length prefixes and varint field values.

use crate::error::{CodecResult, ProtocolError};

/// Maximum bytes needed for a u32 varint (5 bytes)
pub const MAX_VARINT_U32_SIZE: usize = 5;

/// Encode a u32 as varint into the given buffer
///
/// Always writes at least one byte, so it is safe for length prefixes.
/// Returns the number of bytes written, or `ShortBuffer` if insufficient space.
#[inline]
pub fn encode_u32(value: u32, buf: &mut [u8]) -> CodecResult<usize> {
    let mut value = value;
    let mut pos = 0;

    loop {
        if pos >= buf.len() {
            return Err(ProtocolError::ShortBuffer);
        }

        if value < 0x80 {
            buf[pos] = value as u8;
            return Ok(pos + 1);
        }

        buf[pos] = (value as u8) | 0x80;
        value >>= 7;
        pos += 1;
    }
}

/// Encode a u32 as a standalone varint byte string
///
/// Zero encodes to an empty byte string; [`decode_at`] reads an empty
/// input back as zero.
pub fn to_bytes(value: u32) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let mut buf = [0u8; MAX_VARINT_U32_SIZE];
    // five bytes always hold a u32
    let len = encode_u32(value, &mut buf).unwrap_or(0);
    buf[..len].to_vec()
}

/// Decode a u32 varint from the start of the given buffer
///
/// Returns (value, bytes_consumed). A sixth byte would push the shift past 31
/// bits and fails with `Overflow`; input ending mid-varint is `UnexpectedEof`.
#[inline]
pub fn decode_u32(buf: &[u8]) -> CodecResult<(u32, usize)> {
    let mut result = 0u32;
    let mut shift = 0;
    let mut pos = 0;

    loop {
        if shift > 31 {
            return Err(ProtocolError::Overflow);
        }

        if pos >= buf.len() {
            return Err(ProtocolError::UnexpectedEof);
        }

        let byte = buf[pos];
        pos += 1;

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 == 0 {
            return Ok((result, pos));
        }

        shift += 7;
    }
}

/// Decode a u32 varint starting at `offset`
///
/// Returns `(0, 0)` when no byte is available at `offset`.
#[inline]
pub fn decode_at(buf: &[u8], offset: usize) -> CodecResult<(u32, usize)> {
    match buf.get(offset..) {
        Some(rest) if !rest.is_empty() => decode_u32(rest),
        _ => Ok((0, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_roundtrip() {
        let test_values = [0, 1, 127, 128, 300, 16383, 16384, u32::MAX];

        for &val in &test_values {
            let mut buf = [0u8; MAX_VARINT_U32_SIZE];
            let encoded_len = encode_u32(val, &mut buf).unwrap();
            let (decoded_val, decoded_len) = decode_u32(&buf[..encoded_len]).unwrap();

            assert_eq!(val, decoded_val);
            assert_eq!(encoded_len, decoded_len);
        }
    }

    #[test]
    fn test_to_bytes_known_values() {
        assert_eq!(to_bytes(0), Vec::<u8>::new());
        assert_eq!(to_bytes(1), vec![0x01]);
        assert_eq!(to_bytes(127), vec![0x7F]);
        assert_eq!(to_bytes(128), vec![0x80, 0x01]);
        assert_eq!(to_bytes(300), vec![0xAC, 0x02]);
        assert_eq!(to_bytes(u32::MAX), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_empty_decodes_as_zero() {
        assert_eq!(decode_at(&to_bytes(0), 0), Ok((0, 0)));
        assert_eq!(decode_at(&[0x05], 1), Ok((0, 0)));
        assert_eq!(decode_at(&[0x05], 7), Ok((0, 0)));
    }

    #[test]
    fn test_decode_at_offset() {
        let buf = [0xFF, 0xAC, 0x02, 0x01];
        assert_eq!(decode_at(&buf, 1), Ok((300, 2)));
        assert_eq!(decode_at(&buf, 3), Ok((1, 1)));
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 2];
        assert_eq!(encode_u32(u32::MAX, &mut buf), Err(ProtocolError::ShortBuffer));
    }

    #[test]
    fn test_unexpected_eof() {
        let buf = [0x80];
        assert_eq!(decode_u32(&buf), Err(ProtocolError::UnexpectedEof));
    }

    #[test]
    fn test_overflow_after_five_bytes() {
        let buf = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(decode_u32(&buf), Err(ProtocolError::Overflow));
        assert_eq!(decode_at(&buf, 0), Err(ProtocolError::Overflow));
    }
}
