//! Event frame parsing
//!
//! Decodes the payload of E-frames. The caller has already consumed the `E`
//! marker; rollover correction of event times is applied by the frame parser.

use crate::error::{DecodeError, Result};
use crate::parser::primitive::*;
use crate::parser::stream::ByteCursor;
use crate::types::{AdjustmentValue, LogEvent};

const LOG_END_MESSAGE: &[u8; 11] = b"End of log\0";

/// Helper for inflight adjustment events: functions above 127 carry a float
fn parse_inflight_adjustment(cursor: &mut ByteCursor) -> Result<LogEvent> {
    let function = read_u8(cursor)?;
    if function > 127 {
        Ok(LogEvent::InflightAdjustment {
            function,
            value: AdjustmentValue::Float(read_f32_le(cursor)?),
        })
    } else {
        Ok(LogEvent::InflightAdjustment {
            function,
            value: AdjustmentValue::Int(read_signed_vb(cursor)?),
        })
    }
}

/// Parse one event payload
///
/// Times in the returned event are raw 32-bit logger times.
pub fn parse_event(cursor: &mut ByteCursor, frame_start: usize) -> Result<LogEvent> {
    let event_type = read_u8(cursor)?;

    let event = match event_type {
        LogEvent::SYNC_BEEP => LogEvent::SyncBeep {
            time_us: read_unsigned_vb(cursor)? as i64,
        },
        LogEvent::AUTOTUNE_CYCLE_START => {
            let phase = read_u8(cursor)?;
            let cycle = read_u8(cursor)?;
            LogEvent::AutotuneCycleStart {
                phase,
                cycle: cycle & 0x7f,
                rising: cycle >> 7 != 0,
                p: read_u8(cursor)?,
                i: read_u8(cursor)?,
                d: read_u8(cursor)?,
            }
        }
        LogEvent::AUTOTUNE_CYCLE_RESULT => LogEvent::AutotuneCycleResult {
            flags: read_u8(cursor)?,
            p: read_u8(cursor)?,
            i: read_u8(cursor)?,
            d: read_u8(cursor)?,
        },
        LogEvent::AUTOTUNE_TARGETS => LogEvent::AutotuneTargets {
            current_angle: read_i16_le(cursor)?,
            target_angle: read_i8(cursor)?,
            target_angle_at_peak: read_i8(cursor)?,
            first_peak_angle: read_i16_le(cursor)?,
            second_peak_angle: read_i16_le(cursor)?,
        },
        LogEvent::INFLIGHT_ADJUSTMENT => parse_inflight_adjustment(cursor)?,
        LogEvent::LOGGING_RESUME => LogEvent::LoggingResume {
            iteration: read_unsigned_vb(cursor)?,
            time_us: read_unsigned_vb(cursor)? as i64,
        },
        LogEvent::DISARM => LogEvent::Disarm {
            reason: read_unsigned_vb(cursor)?,
        },
        LogEvent::GTUNE_CYCLE_RESULT => LogEvent::GtuneCycleResult {
            axis: read_u8(cursor)?,
            gyro_avg: read_signed_vb(cursor)?,
            new_p: read_i16_le(cursor)?,
        },
        LogEvent::FLIGHT_MODE => LogEvent::FlightMode {
            flags: read_unsigned_vb(cursor)?,
            last_flags: read_unsigned_vb(cursor)?,
        },
        LogEvent::LOG_END => {
            if cursor.read_bytes(LOG_END_MESSAGE.len())? != &LOG_END_MESSAGE[..] {
                return Err(DecodeError::CorruptFrame {
                    frame_type: 'E',
                    offset: frame_start,
                    reason: "log end marker without end-of-log message",
                });
            }
            LogEvent::LogEnd
        }
        _ => {
            return Err(DecodeError::UnknownEvent {
                event_type,
                offset: frame_start,
            })
        }
    };

    Ok(event)
}
