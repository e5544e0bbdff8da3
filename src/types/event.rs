#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// New value reported by an in-flight adjustment
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AdjustmentValue {
    Int(i64),
    Float(f32),
}

/// Payload of an `E` frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LogEvent {
    SyncBeep {
        time_us: i64,
    },
    AutotuneCycleStart {
        phase: u8,
        cycle: u8,
        rising: bool,
        p: u8,
        i: u8,
        d: u8,
    },
    AutotuneCycleResult {
        flags: u8,
        p: u8,
        i: u8,
        d: u8,
    },
    AutotuneTargets {
        current_angle: i16,
        target_angle: i8,
        target_angle_at_peak: i8,
        first_peak_angle: i16,
        second_peak_angle: i16,
    },
    /// `function` is the raw byte; bit 7 set means a float payload
    InflightAdjustment {
        function: u8,
        value: AdjustmentValue,
    },
    LoggingResume {
        iteration: u64,
        time_us: i64,
    },
    Disarm {
        reason: u64,
    },
    GtuneCycleResult {
        axis: u8,
        gyro_avg: i64,
        new_p: i16,
    },
    FlightMode {
        flags: u64,
        last_flags: u64,
    },
    LogEnd,
}

impl LogEvent {
    pub const SYNC_BEEP: u8 = 0;
    pub const AUTOTUNE_CYCLE_START: u8 = 10;
    pub const AUTOTUNE_CYCLE_RESULT: u8 = 11;
    pub const AUTOTUNE_TARGETS: u8 = 12;
    pub const INFLIGHT_ADJUSTMENT: u8 = 13;
    pub const LOGGING_RESUME: u8 = 14;
    pub const DISARM: u8 = 15;
    pub const GTUNE_CYCLE_RESULT: u8 = 20;
    pub const FLIGHT_MODE: u8 = 30;
    pub const LOG_END: u8 = 255;

    /// Event id as written in the log
    pub fn event_type(&self) -> u8 {
        match self {
            LogEvent::SyncBeep { .. } => Self::SYNC_BEEP,
            LogEvent::AutotuneCycleStart { .. } => Self::AUTOTUNE_CYCLE_START,
            LogEvent::AutotuneCycleResult { .. } => Self::AUTOTUNE_CYCLE_RESULT,
            LogEvent::AutotuneTargets { .. } => Self::AUTOTUNE_TARGETS,
            LogEvent::InflightAdjustment { .. } => Self::INFLIGHT_ADJUSTMENT,
            LogEvent::LoggingResume { .. } => Self::LOGGING_RESUME,
            LogEvent::Disarm { .. } => Self::DISARM,
            LogEvent::GtuneCycleResult { .. } => Self::GTUNE_CYCLE_RESULT,
            LogEvent::FlightMode { .. } => Self::FLIGHT_MODE,
            LogEvent::LogEnd => Self::LOG_END,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogEvent::SyncBeep { .. } => "Sync beep",
            LogEvent::AutotuneCycleStart { .. } => "Autotune cycle start",
            LogEvent::AutotuneCycleResult { .. } => "Autotune cycle result",
            LogEvent::AutotuneTargets { .. } => "Autotune targets",
            LogEvent::InflightAdjustment { .. } => "Inflight adjustment",
            LogEvent::LoggingResume { .. } => "Logging resume",
            LogEvent::Disarm { .. } => "Disarm",
            LogEvent::GtuneCycleResult { .. } => "Gtune cycle result",
            LogEvent::FlightMode { .. } => "Flight mode",
            LogEvent::LogEnd => "Log end",
        }
    }

    /// Adjustment function of an in-flight adjustment, without the float flag
    pub fn adjustment_function(&self) -> Option<u8> {
        match self {
            LogEvent::InflightAdjustment { function, .. } => Some(function & 0x7f),
            _ => None,
        }
    }
}
