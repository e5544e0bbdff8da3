use crate::error::DecodeError;
use crate::types::{FrameType, LogEvent, LogHeader};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::Serialize;

/// One fully resolved frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ResolvedRow {
    /// Loop iteration of the frame (or of the last main frame for G/H/S rows)
    pub index: u64,
    /// Microseconds since boot, rollover-corrected
    pub time_us: Option<i64>,
    pub values: Vec<i64>,
}

/// Rows of one frame type in decode order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FrameTable {
    pub frame_type: FrameType,
    pub columns: Vec<String>,
    pub rows: Vec<ResolvedRow>,
}

impl FrameTable {
    pub fn new(frame_type: FrameType, columns: Vec<String>) -> Self {
        Self {
            frame_type,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<i64>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.values[index]).collect())
    }

    pub fn first(&self) -> Option<&ResolvedRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&ResolvedRow> {
        self.rows.last()
    }
}

/// A decoded event with the main-stream position it occurred at
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EventRecord {
    pub event: LogEvent,
    /// Iteration of the last accepted main frame before the event
    pub iteration: Option<u64>,
    pub time_us: Option<i64>,
    /// Offset of the `E` marker in the file
    pub offset: usize,
}

/// Frame counters for one sub-log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FrameStats {
    pub i_frames: u32,
    pub p_frames: u32,
    pub g_frames: u32,
    pub h_frames: u32,
    pub s_frames: u32,
    pub e_frames: u32,
    /// Main frames decoded but rejected by iteration/time validation
    pub invalid_frames: u32,
    /// Frames abandoned because they failed to decode
    pub corrupt_frames: u32,
    /// Bytes skipped while resynchronising
    pub resync_bytes: u64,
    /// Iterations the logger skipped on purpose (P interval sampling)
    pub skipped_iterations: u64,
    pub total_bytes: u64,
}

impl FrameStats {
    pub fn total_frames(&self) -> u32 {
        self.i_frames + self.p_frames + self.g_frames + self.h_frames + self.s_frames + self.e_frames
    }
}

/// Everything decoded from one sub-log
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DecodedLog {
    /// Position of this sub-log in the file, from 0
    pub index: usize,
    /// Byte range of the sub-log in the file
    pub range: Range<usize>,
    pub header: LogHeader,
    /// I and P frames merged
    pub main: FrameTable,
    pub gps: Option<FrameTable>,
    pub gps_home: Option<FrameTable>,
    pub slow: Option<FrameTable>,
    pub events: Vec<EventRecord>,
    pub stats: FrameStats,
    /// Why the frame stream stopped early, if it did
    pub termination: Option<DecodeError>,
}

impl DecodedLog {
    /// Time between the first and last main rows
    pub fn duration_us(&self) -> i64 {
        match (
            self.main.first().and_then(|r| r.time_us),
            self.main.last().and_then(|r| r.time_us),
        ) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_us() as f64 / 1_000_000.0
    }

    /// Mean main-frame rate over the log
    pub fn sample_rate_hz(&self) -> f64 {
        let duration_us = self.duration_us();
        if self.main.len() < 2 || duration_us <= 0 {
            return 0.0;
        }
        (self.main.len() - 1) as f64 / (duration_us as f64 / 1_000_000.0)
    }

    /// Table holding rows of `frame_type`; I and P share the main table
    pub fn table(&self, frame_type: FrameType) -> Option<&FrameTable> {
        match frame_type {
            FrameType::Intra | FrameType::Inter => Some(&self.main),
            FrameType::Gps => self.gps.as_ref(),
            FrameType::GpsHome => self.gps_home.as_ref(),
            FrameType::Slow => self.slow.as_ref(),
            FrameType::Event => None,
        }
    }

    /// True if the frame stream ran to its end without a fatal resync
    pub fn is_complete(&self) -> bool {
        self.termination.is_none()
    }

    pub fn has_gps_data(&self) -> bool {
        self.gps.as_ref().is_some_and(|t| !t.is_empty())
    }
}
