//! Helper functions for blackbox decoding
//!
//! Sign extension for the fixed-width two's-complement fields packed inside
//! the joint encodings.

/// Sign-extend the low `bits` bits of `value`
pub fn sign_extend(value: u32, bits: u32) -> i64 {
    debug_assert!((1..=32).contains(&bits));
    let shift = 32 - bits;
    (((value << shift) as i32) >> shift) as i64
}

/// Sign-extend a 2-bit value
pub fn sign_extend_2bit(value: u8) -> i64 {
    sign_extend(value as u32, 2)
}

/// Sign-extend a 4-bit value
pub fn sign_extend_4bit(value: u8) -> i64 {
    sign_extend(value as u32, 4)
}

pub fn sign_extend_5bit(value: u8) -> i64 {
    sign_extend(value as u32, 5)
}

/// Sign-extend a 6-bit value
pub fn sign_extend_6bit(value: u8) -> i64 {
    sign_extend(value as u32, 6)
}

pub fn sign_extend_7bit(value: u8) -> i64 {
    sign_extend(value as u32, 7)
}

/// Sign-extend an 8-bit value
pub fn sign_extend_8bit(value: u8) -> i64 {
    value as i8 as i64
}

/// Sign-extend a 14-bit value
pub fn sign_extend_14bit(value: u32) -> i64 {
    sign_extend(value & 0x3fff, 14)
}

/// Sign-extend a 16-bit value
pub fn sign_extend_16bit(value: u16) -> i64 {
    value as i16 as i64
}

/// Sign-extend a 24-bit value
pub fn sign_extend_24bit(value: u32) -> i64 {
    sign_extend(value & 0x00ff_ffff, 24)
}
