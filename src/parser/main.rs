//! Top-level decoding API
//!
//! A blackbox file holds one sub-log per arm cycle, each starting with its
//! own text header. [`RawLog`] splits the buffer on the header preamble and
//! decodes every range independently.

use crate::error::{DecodeError, Result};
use crate::parser::frame::{FrameParser, FrameRun};
use crate::parser::header::parse_header;
use crate::parser::stream::ByteCursor;
use crate::types::{DecodedLog, LogHeader};
use memchr::memmem;
use std::ops::Range;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// First header line of every sub-log
pub const LOG_START_MARKER: &[u8] = b"H Product:Blackbox flight data recorder by Nicholas Sherlock";

/// Default bound on bytes scanned while resynchronising after a corrupt frame
pub const DEFAULT_MAX_RESYNC_DISTANCE: usize = 4096;

/// Decoder behaviour switches
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecodeOptions {
    /// Keep decoded deltas instead of predicted values (`Increment` still
    /// applies); also turns off main-frame validation
    pub raw: bool,
    /// Reject main frames whose iteration or time jumps implausibly
    pub validate_frames: bool,
    pub max_resync_distance: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            raw: false,
            validate_frames: true,
            max_resync_distance: DEFAULT_MAX_RESYNC_DISTANCE,
        }
    }
}

/// An in-memory blackbox file split into sub-log ranges
#[derive(Debug, Clone)]
pub struct RawLog<'a> {
    data: &'a [u8],
    logs: Vec<Range<usize>>,
}

impl<'a> RawLog<'a> {
    /// Locate every sub-log in `data`
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let starts: Vec<usize> = memmem::find_iter(data, LOG_START_MARKER).collect();
        if starts.is_empty() {
            return Err(DecodeError::NoLogsFound);
        }

        let logs = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| start..starts.get(i + 1).copied().unwrap_or(data.len()))
            .collect::<Vec<_>>();

        debug!(bytes = data.len(), logs = logs.len(), "split blackbox file");
        Ok(Self { data, logs })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    pub fn log_ranges(&self) -> &[Range<usize>] {
        &self.logs
    }

    pub fn log_range(&self, index: usize) -> Option<Range<usize>> {
        self.logs.get(index).cloned()
    }

    fn cursor(&self, index: usize) -> Option<ByteCursor<'a>> {
        self.log_range(index)
            .map(|range| ByteCursor::with_range(self.data, range.start, range.end))
    }

    /// Parse only the text header of one sub-log
    pub fn header(&self, index: usize) -> Option<Result<LogHeader>> {
        let mut cursor = self.cursor(index)?;
        Some(parse_header(&mut cursor).map_err(|e| e.in_log(index)))
    }

    /// Decode one sub-log
    ///
    /// Header errors fail the sub-log. Frame corruption never does: a resync
    /// that gives up is reported through [`DecodedLog::termination`] next to
    /// the rows decoded before it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`log_count`](Self::log_count).
    pub fn decode(&self, index: usize, options: &DecodeOptions) -> Result<DecodedLog> {
        let range = self.logs[index].clone();
        let mut cursor = ByteCursor::with_range(self.data, range.start, range.end);

        let header = parse_header(&mut cursor).map_err(|e| e.in_log(index))?;
        debug!(
            log = index,
            firmware = header.config.firmware_revision().unwrap_or("unknown"),
            fields = header.intra.len(),
            "decoding sub-log"
        );

        let FrameRun {
            tables,
            mut stats,
            termination,
        } = FrameParser::new(&header, options).run(&mut cursor);
        stats.total_bytes = range.len() as u64;

        if let Some(err) = &termination {
            warn!(log = index, error = %err, "sub-log ended before its data");
        }

        Ok(tables.finish(index, range, header, stats, termination))
    }

    /// Decode every sub-log in file order
    pub fn decode_all(&self, options: &DecodeOptions) -> Vec<Result<DecodedLog>> {
        (0..self.log_count())
            .map(|index| self.decode(index, options))
            .collect()
    }

    /// Decode every sub-log, one rayon task each; output stays in file order
    #[cfg(feature = "parallel")]
    pub fn decode_all_parallel(&self, options: &DecodeOptions) -> Vec<Result<DecodedLog>> {
        use rayon::prelude::*;

        (0..self.log_count())
            .into_par_iter()
            .map(|index| self.decode(index, options))
            .collect()
    }
}

/// Split and decode a whole file buffer
///
/// Fails only when the buffer holds no sub-log; each sub-log then succeeds or
/// fails on its own.
pub fn decode_logs(data: &[u8], options: &DecodeOptions) -> Result<Vec<Result<DecodedLog>>> {
    Ok(RawLog::new(data)?.decode_all(options))
}
