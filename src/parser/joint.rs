//! Joint field codecs
//!
//! These encodings pack the deltas of several neighbouring fields behind one
//! leading tag byte. A decode either produces every delta of the group or
//! fails; callers only ever see complete groups.

use crate::error::{DecodeError, Result};
use crate::parser::helpers::*;
use crate::parser::primitive::read_signed_vb;
use crate::parser::stream::ByteCursor;

/// Largest group any joint encoding produces
pub const MAX_GROUP_LEN: usize = 8;

/// Signed deltas produced by one joint decode, in field order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deltas {
    values: [i64; MAX_GROUP_LEN],
    len: usize,
}

impl Deltas {
    fn new(values: [i64; MAX_GROUP_LEN], len: usize) -> Self {
        Self {
            values,
            len: len.min(MAX_GROUP_LEN),
        }
    }

    pub fn from_single(value: i64) -> Self {
        let mut values = [0i64; MAX_GROUP_LEN];
        values[0] = value;
        Self { values, len: 1 }
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.values[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// Tag8_4S16 per-field selectors
const FIELD_ZERO: u8 = 0;
const FIELD_4BIT: u8 = 1;
const FIELD_8BIT: u8 = 2;
const FIELD_16BIT: u8 = 3;

/// Reject selectors that describe values past the end of a short group
fn check_unused_selectors(
    encoding: &'static str,
    tag: u8,
    bits_per_field: u32,
    len: usize,
    fields: usize,
    offset: usize,
) -> Result<()> {
    for i in len..fields {
        let mask = ((1u16 << bits_per_field) - 1) as u8;
        if (tag >> (i as u32 * bits_per_field)) & mask != 0 {
            return Err(DecodeError::InvalidTag {
                encoding,
                tag,
                offset,
            });
        }
    }
    Ok(())
}

/// Tag8_4S16 as written by data version 2 and later: nibble-packed payload
pub fn read_tag8_4s16_v2(cursor: &mut ByteCursor, len: usize) -> Result<Deltas> {
    let offset = cursor.position();
    let mut selector = cursor.read_byte()?;
    check_unused_selectors("Tag8_4S16", selector, 2, len, 4, offset)?;

    let mut values = [0i64; MAX_GROUP_LEN];
    let mut nibble_index = 0;
    let mut buffer = 0u8;

    for value in values.iter_mut().take(4) {
        match selector & 0x03 {
            FIELD_ZERO => *value = 0,
            FIELD_4BIT => {
                if nibble_index == 0 {
                    buffer = cursor.read_byte()?;
                    *value = sign_extend_4bit(buffer >> 4);
                    nibble_index = 1;
                } else {
                    *value = sign_extend_4bit(buffer & 0x0f);
                    nibble_index = 0;
                }
            }
            FIELD_8BIT => {
                if nibble_index == 0 {
                    *value = sign_extend_8bit(cursor.read_byte()?);
                } else {
                    let mut char1 = (buffer & 0x0f) << 4;
                    buffer = cursor.read_byte()?;
                    char1 |= buffer >> 4;
                    *value = sign_extend_8bit(char1);
                }
            }
            FIELD_16BIT => {
                if nibble_index == 0 {
                    let char1 = cursor.read_byte()?;
                    let char2 = cursor.read_byte()?;
                    *value = sign_extend_16bit(((char1 as u16) << 8) | char2 as u16);
                } else {
                    let char1 = cursor.read_byte()?;
                    let char2 = cursor.read_byte()?;
                    *value = sign_extend_16bit(
                        (((buffer & 0x0f) as u16) << 12) | ((char1 as u16) << 4) | ((char2 as u16) >> 4),
                    );
                    buffer = char2;
                }
            }
            _ => unreachable!(),
        }
        selector >>= 2;
    }

    Ok(Deltas::new(values, len))
}

/// Tag8_4S16 as written by data version 1: 4-bit fields are paired in one byte
pub fn read_tag8_4s16_v1(cursor: &mut ByteCursor, len: usize) -> Result<Deltas> {
    let offset = cursor.position();
    let mut selector = cursor.read_byte()?;
    check_unused_selectors("Tag8_4S16", selector, 2, len, 4, offset)?;

    let mut values = [0i64; MAX_GROUP_LEN];
    let mut i = 0;

    while i < 4 {
        match selector & 0x03 {
            FIELD_ZERO => values[i] = 0,
            FIELD_4BIT => {
                let combined = cursor.read_byte()?;
                values[i] = sign_extend_4bit(combined & 0x0f);
                i += 1;
                selector >>= 2;
                if i < 4 {
                    values[i] = sign_extend_4bit(combined >> 4);
                }
            }
            FIELD_8BIT => values[i] = sign_extend_8bit(cursor.read_byte()?),
            FIELD_16BIT => {
                let char1 = cursor.read_byte()?;
                let char2 = cursor.read_byte()?;
                values[i] = sign_extend_16bit(char1 as u16 | ((char2 as u16) << 8));
            }
            _ => unreachable!(),
        }
        selector >>= 2;
        i += 1;
    }

    Ok(Deltas::new(values, len))
}

/// Per-field 8/16/24/32-bit little-endian payloads selected by the low six tag bits
fn read_tag2_wide_fields(cursor: &mut ByteCursor, lead: u8, values: &mut [i64]) -> Result<()> {
    let mut selector = lead;
    for value in values.iter_mut().take(3) {
        *value = match selector & 0x03 {
            0 => sign_extend_8bit(cursor.read_byte()?),
            1 => {
                let bytes = cursor.read_bytes(2)?;
                sign_extend_16bit(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
            2 => {
                let bytes = cursor.read_bytes(3)?;
                sign_extend_24bit(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
            }
            _ => {
                let bytes = cursor.read_bytes(4)?;
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64
            }
        };
        selector >>= 2;
    }
    Ok(())
}

/// Tag2_3S32: three fields, top two tag bits select 2/4/6-bit or wide layout
pub fn read_tag2_3s32(cursor: &mut ByteCursor, len: usize) -> Result<Deltas> {
    let lead = cursor.read_byte()?;
    let mut values = [0i64; MAX_GROUP_LEN];

    match lead >> 6 {
        0 => {
            // 2-bit fields
            values[0] = sign_extend_2bit((lead >> 4) & 0x03);
            values[1] = sign_extend_2bit((lead >> 2) & 0x03);
            values[2] = sign_extend_2bit(lead & 0x03);
        }
        1 => {
            // 4-bit fields
            values[0] = sign_extend_4bit(lead & 0x0f);
            let byte = cursor.read_byte()?;
            values[1] = sign_extend_4bit(byte >> 4);
            values[2] = sign_extend_4bit(byte & 0x0f);
        }
        2 => {
            // 6-bit fields
            values[0] = sign_extend_6bit(lead & 0x3f);
            values[1] = sign_extend_6bit(cursor.read_byte()? & 0x3f);
            values[2] = sign_extend_6bit(cursor.read_byte()? & 0x3f);
        }
        _ => read_tag2_wide_fields(cursor, lead, &mut values)?,
    }

    Ok(Deltas::new(values, len))
}

/// Tag2_3SVariable: like Tag2_3S32 but with 2/2/2, 5/5/4 and 8/7/7 bit layouts
pub fn read_tag2_3svariable(cursor: &mut ByteCursor, len: usize) -> Result<Deltas> {
    let lead = cursor.read_byte()?;
    let mut values = [0i64; MAX_GROUP_LEN];

    match lead >> 6 {
        0 => {
            values[0] = sign_extend_2bit((lead >> 4) & 0x03);
            values[1] = sign_extend_2bit((lead >> 2) & 0x03);
            values[2] = sign_extend_2bit(lead & 0x03);
        }
        1 => {
            // ss11 1112 2222 3333
            let lead2 = cursor.read_byte()?;
            values[0] = sign_extend_5bit((lead & 0x3e) >> 1);
            values[1] = sign_extend_5bit(((lead & 0x01) << 4) | (lead2 >> 4));
            values[2] = sign_extend_4bit(lead2 & 0x0f);
        }
        2 => {
            // ss11 1111 1122 2222 2333 3333
            let lead2 = cursor.read_byte()?;
            values[0] = sign_extend_8bit(((lead & 0x3f) << 2) | (lead2 >> 6));
            let lead3 = cursor.read_byte()?;
            values[1] = sign_extend_7bit(((lead2 & 0x3f) << 1) | (lead3 >> 7));
            values[2] = sign_extend_7bit(lead3 & 0x7f);
        }
        _ => read_tag2_wide_fields(cursor, lead, &mut values)?,
    }

    Ok(Deltas::new(values, len))
}

/// Tag8_8SVB: one presence bit per field, each present field a signed varint
///
/// A group of one has no tag byte at all.
pub fn read_tag8_8svb(cursor: &mut ByteCursor, len: usize) -> Result<Deltas> {
    let mut values = [0i64; MAX_GROUP_LEN];

    if len == 1 {
        values[0] = read_signed_vb(cursor)?;
        return Ok(Deltas::new(values, 1));
    }

    let offset = cursor.position();
    let mut header = cursor.read_byte()?;
    check_unused_selectors("Tag8_8SVB", header, 1, len, 8, offset)?;

    for value in values.iter_mut().take(len) {
        if header & 0x01 != 0 {
            *value = read_signed_vb(cursor)?;
        }
        header >>= 1;
    }

    Ok(Deltas::new(values, len))
}
