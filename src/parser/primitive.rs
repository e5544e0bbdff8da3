//! Primitive field codecs
//!
//! Each function decodes one scalar starting at the cursor position and
//! leaves the cursor just past it. None of them know about prediction.

use crate::error::{DecodeError, Result};
use crate::parser::helpers::sign_extend_14bit;
use crate::parser::stream::ByteCursor;

/// Longest unsigned varint accepted before the stream is considered corrupt
pub const MAX_VARINT_BYTES: usize = 10;

/// Read a little-endian base-128 unsigned varint
pub fn read_unsigned_vb(cursor: &mut ByteCursor) -> Result<u64> {
    let start = cursor.position();
    let mut result = 0u64;
    let mut shift = 0u32;

    for _ in 0..MAX_VARINT_BYTES {
        let byte = cursor.read_byte()?;
        result |= ((byte & 0x7f) as u64) << shift;

        // Final byte?
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
    }

    Err(DecodeError::MalformedVarint { offset: start })
}

/// Read a zig-zag encoded signed varint
pub fn read_signed_vb(cursor: &mut ByteCursor) -> Result<i64> {
    Ok(zigzag_decode(read_unsigned_vb(cursor)?))
}

/// Read a varint holding the negated 14-bit two's-complement value
pub fn read_neg_14bit(cursor: &mut ByteCursor) -> Result<i64> {
    let unsigned = read_unsigned_vb(cursor)?;
    Ok(-sign_extend_14bit(unsigned as u32))
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn read_u8(cursor: &mut ByteCursor) -> Result<u8> {
    cursor.read_byte()
}

pub fn read_i8(cursor: &mut ByteCursor) -> Result<i8> {
    Ok(cursor.read_byte()? as i8)
}

pub fn read_i16_le(cursor: &mut ByteCursor) -> Result<i16> {
    let bytes = cursor.read_bytes(2)?;
    Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn read_u32_le(cursor: &mut ByteCursor) -> Result<u32> {
    let bytes = cursor.read_bytes(4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn read_f32_le(cursor: &mut ByteCursor) -> Result<f32> {
    Ok(f32::from_bits(read_u32_le(cursor)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_unsigned_vb(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        while value > 0x7f {
            out.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
        out
    }

    fn zigzag_encode(value: i64) -> u64 {
        ((value << 1) ^ (value >> 63)) as u64
    }

    #[test]
    fn test_unsigned_vb_known_values() {
        let mut cursor = ByteCursor::new(&[0x00, 0x7f, 0xe8, 0x07, 0x80, 0x01]);
        assert_eq!(read_unsigned_vb(&mut cursor), Ok(0));
        assert_eq!(read_unsigned_vb(&mut cursor), Ok(127));
        assert_eq!(read_unsigned_vb(&mut cursor), Ok(1000));
        assert_eq!(read_unsigned_vb(&mut cursor), Ok(128));
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_unsigned_vb_reencodes_identically() {
        // every length from 1 to 9 bytes, including the boundary values of each length
        for length in 1..=9u32 {
            let low = if length == 1 { 0 } else { 1u64 << (7 * (length - 1)) };
            let high = (1u64 << (7 * length)) - 1;
            for value in [low, low + 1, high / 2, high] {
                let bytes = encode_unsigned_vb(value);
                assert_eq!(bytes.len(), length as usize);
                let mut cursor = ByteCursor::new(&bytes);
                let decoded = read_unsigned_vb(&mut cursor).expect("valid varint");
                assert_eq!(decoded, value);
                assert_eq!(cursor.position(), bytes.len());
                assert_eq!(encode_unsigned_vb(decoded), bytes);
            }
        }
    }

    #[test]
    fn test_unsigned_vb_rejects_unterminated() {
        let bytes = [0xffu8; 12];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(
            read_unsigned_vb(&mut cursor),
            Err(DecodeError::MalformedVarint { offset: 0 })
        );
        assert_eq!(cursor.position(), MAX_VARINT_BYTES);
    }

    #[test]
    fn test_unsigned_vb_truncated() {
        let mut cursor = ByteCursor::new(&[0x80, 0x80]);
        assert_eq!(
            read_unsigned_vb(&mut cursor),
            Err(DecodeError::EndOfData { offset: 2 })
        );
    }

    #[test]
    fn test_zigzag_is_bijective() {
        for value in [
            0i64,
            1,
            -1,
            2,
            -2,
            63,
            -64,
            i32::MAX as i64,
            i32::MIN as i64,
            i64::MAX,
            i64::MIN,
        ] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value, "value {value}");
        }
        assert_eq!(zigzag_decode(0), 0);
        assert_eq!(zigzag_decode(1), -1);
        assert_eq!(zigzag_decode(2), 1);
        assert_eq!(zigzag_decode(3), -2);
    }

    #[test]
    fn test_signed_vb() {
        let bytes: Vec<u8> = [-1i64, 500, -500]
            .iter()
            .flat_map(|v| encode_unsigned_vb(zigzag_encode(*v)))
            .collect();
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(read_signed_vb(&mut cursor), Ok(-1));
        assert_eq!(read_signed_vb(&mut cursor), Ok(500));
        assert_eq!(read_signed_vb(&mut cursor), Ok(-500));
    }

    #[test]
    fn test_neg_14bit() {
        // 5 -> -5; 0x3FFF is -1 in 14 bits -> 1
        let mut bytes = encode_unsigned_vb(5);
        bytes.extend(encode_unsigned_vb(0x3fff));
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(read_neg_14bit(&mut cursor), Ok(-5));
        assert_eq!(read_neg_14bit(&mut cursor), Ok(1));
    }

    #[test]
    fn test_fixed_width_reads() {
        let mut bytes = vec![0xfe, 0x34, 0x12];
        bytes.extend(1.5f32.to_le_bytes());
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(read_i8(&mut cursor), Ok(-2));
        assert_eq!(read_i16_le(&mut cursor), Ok(0x1234));
        assert_eq!(read_f32_le(&mut cursor), Ok(1.5));
        assert!(read_u8(&mut cursor).is_err());
    }
}
