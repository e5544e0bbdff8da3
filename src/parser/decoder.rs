use crate::error::Result;
use crate::parser::joint::{self, Deltas};
use crate::parser::primitive;
use crate::parser::stream::ByteCursor;
use crate::types::{Encoding, FieldGroup};

/// Decode the delta of one field
pub fn decode_field_value(
    cursor: &mut ByteCursor,
    encoding: Encoding,
    data_version: i64,
) -> Result<i64> {
    match encoding {
        Encoding::SignedVB => primitive::read_signed_vb(cursor),
        Encoding::UnsignedVB => Ok(primitive::read_unsigned_vb(cursor)? as i64),
        Encoding::Neg14Bit => primitive::read_neg_14bit(cursor),
        Encoding::Null => Ok(0),
        // A joint encoding on a lone field still carries its tag
        joint_encoding => Ok(decode_group(cursor, joint_encoding, 1, data_version)?.as_slice()[0]),
    }
}

/// Decode the deltas of `len` fields sharing one joint encoding
pub fn decode_group(
    cursor: &mut ByteCursor,
    encoding: Encoding,
    len: usize,
    data_version: i64,
) -> Result<Deltas> {
    match encoding {
        Encoding::Tag8_4S16 if data_version < 2 => joint::read_tag8_4s16_v1(cursor, len),
        Encoding::Tag8_4S16 => joint::read_tag8_4s16_v2(cursor, len),
        Encoding::Tag2_3S32 => joint::read_tag2_3s32(cursor, len),
        Encoding::Tag2_3SVariable => joint::read_tag2_3svariable(cursor, len),
        Encoding::Tag8_8SVB => joint::read_tag8_8svb(cursor, len),
        single => Ok(Deltas::from_single(decode_field_value(
            cursor,
            single,
            data_version,
        )?)),
    }
}

/// Decode the raw deltas of every field of one frame, in field order
///
/// Increment fields get a delta of 0; they take their value from history.
/// Either every group decodes or the whole frame fails.
pub fn decode_frame_deltas(
    cursor: &mut ByteCursor,
    groups: &[FieldGroup],
    field_count: usize,
    data_version: i64,
) -> Result<Vec<i64>> {
    let mut deltas = vec![0i64; field_count];

    for group in groups {
        match *group {
            FieldGroup::Increment { .. } => {}
            FieldGroup::Single { field, encoding } => {
                deltas[field] = decode_field_value(cursor, encoding, data_version)?;
            }
            FieldGroup::Joint {
                start,
                len,
                encoding,
            } => {
                let group_deltas = decode_group(cursor, encoding, len, data_version)?;
                deltas[start..start + len].copy_from_slice(group_deltas.as_slice());
            }
        }
    }

    Ok(deltas)
}
