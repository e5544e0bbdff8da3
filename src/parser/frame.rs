//! Binary frame parsing
//!
//! Frames are decoded in two steps. [`FrameParser::parse_frame`] reads one
//! frame and resolves its values against history without changing any state;
//! [`FrameParser::commit`] then validates it and updates history. A frame
//! that fails to decode therefore never leaves partial history behind.

use crate::error::{DecodeError, Result};
use crate::parser::assembler::LogAssembler;
use crate::parser::decoder::decode_frame_deltas;
use crate::parser::event::parse_event;
use crate::parser::main::DecodeOptions;
use crate::parser::predictor::{PredictionInputs, PredictorEngine};
use crate::parser::stream::ByteCursor;
use crate::skipped_frames::count_intentionally_skipped_frames;
use crate::types::{
    EventRecord, FrameHistory, FrameIntervals, FrameSchema, FrameStats, FrameType, LogEvent,
    LogHeader, ResolvedRow,
};
use tracing::{debug, trace, warn};

/// Largest forward iteration step accepted between main frames
pub const MAXIMUM_ITERATION_JUMP_BETWEEN_FRAMES: u64 = 500 * 10;

/// Largest forward time step accepted between main frames (10 s)
pub const MAXIMUM_TIME_JUMP_BETWEEN_FRAMES: i64 = 10 * 1_000_000;

/// A decoded frame that has not yet touched parser state
///
/// There is no variant for unknown frames. A byte that is not a marker, or
/// the marker of a frame type this header does not define, comes back from
/// [`FrameParser::parse_frame`] as [`DecodeError::UnknownFrameType`] and is
/// resynced like any other corrupt frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFrame {
    Intra { offset: usize, row: Vec<i64> },
    Inter {
        offset: usize,
        row: Vec<i64>,
        skipped: u64,
    },
    Gps { offset: usize, row: Vec<i64> },
    GpsHome { offset: usize, row: Vec<i64> },
    Slow { offset: usize, row: Vec<i64> },
    Event { offset: usize, event: LogEvent },
}

/// Outcome of scanning for the next frame after a decode failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resync {
    /// A plausible marker was found after skipping this many bytes
    Recovered(usize),
    /// No marker within the scan window; the frame stream ends here
    Fatal(DecodeError),
}

/// Everything one pass over a sub-log's frames produced
#[derive(Debug)]
pub struct FrameRun {
    pub tables: LogAssembler,
    pub stats: FrameStats,
    pub termination: Option<DecodeError>,
}

/// Frame decoder for one sub-log
pub struct FrameParser<'h> {
    header: &'h LogHeader,
    options: DecodeOptions,
    engine: PredictorEngine,
    intervals: FrameIntervals,
    iteration_index: Option<usize>,
    time_index: Option<usize>,
    gps_time_index: Option<usize>,

    history: FrameHistory,
    main_stream_valid: bool,
    last_iteration: Option<u64>,
    last_time: Option<i64>,
    time_rollover_accumulator: i64,
    log_ended: bool,

    tables: LogAssembler,
    stats: FrameStats,
}

impl<'h> FrameParser<'h> {
    pub fn new(header: &'h LogHeader, options: &DecodeOptions) -> Self {
        Self {
            header,
            options: options.clone(),
            engine: PredictorEngine::from_header(header),
            intervals: header.config.frame_intervals(),
            iteration_index: header.intra.index_of("loopIteration"),
            time_index: header.intra.index_of("time"),
            gps_time_index: header.gps.as_ref().and_then(|s| s.index_of("time")),
            history: FrameHistory::new(),
            main_stream_valid: false,
            last_iteration: None,
            last_time: None,
            time_rollover_accumulator: 0,
            log_ended: false,
            tables: LogAssembler::new(header),
            stats: FrameStats::default(),
        }
    }

    /// Decode frames until the data, the log or the resync budget runs out
    pub fn run(mut self, cursor: &mut ByteCursor) -> FrameRun {
        let mut termination = None;

        while !cursor.is_eof() && !self.log_ended {
            let frame_start = cursor.position();
            match self.parse_frame(cursor) {
                Ok(frame) => self.commit(frame),
                Err(err) => {
                    warn!(offset = frame_start, error = %err, "corrupt frame, resyncing");
                    self.stats.corrupt_frames += 1;
                    match self.resync(cursor, frame_start) {
                        Resync::Recovered(skipped) => {
                            self.stats.resync_bytes += skipped as u64 + 1;
                        }
                        Resync::Fatal(fatal) => {
                            warn!(error = %fatal, "frame stream terminated early");
                            termination = Some(fatal);
                            break;
                        }
                    }
                }
            }
        }

        debug!(
            main_rows = self.tables.main_rows(),
            i_frames = self.stats.i_frames,
            p_frames = self.stats.p_frames,
            corrupt = self.stats.corrupt_frames,
            invalid = self.stats.invalid_frames,
            "frame stream finished"
        );

        FrameRun {
            tables: self.tables,
            stats: self.stats,
            termination,
        }
    }

    /// Read and resolve the frame at the cursor
    pub fn parse_frame(&self, cursor: &mut ByteCursor) -> Result<ParsedFrame> {
        let offset = cursor.position();
        let marker = cursor.read_byte()?;

        let frame_type = FrameType::from_marker(marker)
            .filter(|_| self.header.accepts_marker(marker))
            .ok_or(DecodeError::UnknownFrameType { marker, offset })?;

        trace!(offset, frame_type = %frame_type, "frame");

        let frame = match frame_type {
            FrameType::Event => ParsedFrame::Event {
                offset,
                event: parse_event(cursor, offset)?,
            },
            FrameType::Intra => ParsedFrame::Intra {
                offset,
                row: self.read_row(
                    cursor,
                    &self.header.intra,
                    PredictionInputs {
                        previous: self.history.main.previous(),
                        ..self.shared_inputs()
                    },
                )?,
            },
            FrameType::Inter => {
                let skipped =
                    count_intentionally_skipped_frames(self.last_iteration, &self.intervals);
                let schema = self.schema(FrameType::Inter, offset)?;
                let row = self.read_row(
                    cursor,
                    schema,
                    PredictionInputs {
                        previous: self.history.main.previous(),
                        previous2: self.history.main.previous2(),
                        skipped_frames: skipped,
                        ..self.shared_inputs()
                    },
                )?;
                ParsedFrame::Inter {
                    offset,
                    row,
                    skipped,
                }
            }
            FrameType::Gps => ParsedFrame::Gps {
                offset,
                row: self.read_other(cursor, FrameType::Gps, offset)?,
            },
            FrameType::GpsHome => ParsedFrame::GpsHome {
                offset,
                row: self.read_other(cursor, FrameType::GpsHome, offset)?,
            },
            FrameType::Slow => ParsedFrame::Slow {
                offset,
                row: self.read_other(cursor, FrameType::Slow, offset)?,
            },
        };

        Ok(frame)
    }

    fn schema(&self, frame_type: FrameType, offset: usize) -> Result<&'h FrameSchema> {
        self.header
            .schema(frame_type)
            .ok_or(DecodeError::UnknownFrameType {
                marker: frame_type.marker(),
                offset,
            })
    }

    /// Inputs every frame type can see
    fn shared_inputs(&self) -> PredictionInputs<'_> {
        PredictionInputs {
            gps_home: self.history.gps_home.previous(),
            last_main_time: self
                .time_index
                .zip(self.history.main.previous())
                .map(|(i, row)| row[i]),
            ..Default::default()
        }
    }

    /// G, H and S frames predict against their own history slot
    fn read_other(
        &self,
        cursor: &mut ByteCursor,
        frame_type: FrameType,
        offset: usize,
    ) -> Result<Vec<i64>> {
        let schema = self.schema(frame_type, offset)?;
        let slot = self.history.slot(frame_type);
        self.read_row(
            cursor,
            schema,
            PredictionInputs {
                previous: slot.and_then(|s| s.previous()),
                previous2: slot.and_then(|s| s.previous2()),
                ..self.shared_inputs()
            },
        )
    }

    fn read_row(
        &self,
        cursor: &mut ByteCursor,
        schema: &FrameSchema,
        inputs: PredictionInputs<'_>,
    ) -> Result<Vec<i64>> {
        let deltas = decode_frame_deltas(
            cursor,
            &schema.groups,
            schema.len(),
            self.header.data_version,
        )?;
        Ok(self
            .engine
            .resolve_row(schema, deltas, &inputs, self.options.raw))
    }

    /// Apply a parsed frame to history and the output tables
    pub fn commit(&mut self, frame: ParsedFrame) {
        match frame {
            ParsedFrame::Intra { offset, row } => self.commit_main(offset, row, true, 0),
            ParsedFrame::Inter {
                offset,
                row,
                skipped,
            } => self.commit_main(offset, row, false, skipped),
            ParsedFrame::Gps { mut row, .. } => {
                self.stats.g_frames += 1;
                let time_us = match self.gps_time_index {
                    Some(i) => {
                        row[i] = self.apply_time_rollover(row[i]);
                        Some(row[i])
                    }
                    None => self.last_time,
                };
                self.commit_other(FrameType::Gps, row, time_us);
            }
            ParsedFrame::GpsHome { row, .. } => {
                self.stats.h_frames += 1;
                self.commit_other(FrameType::GpsHome, row, self.last_time);
            }
            ParsedFrame::Slow { row, .. } => {
                self.stats.s_frames += 1;
                self.commit_other(FrameType::Slow, row, self.last_time);
            }
            ParsedFrame::Event { offset, event } => self.commit_event(offset, event),
        }
    }

    fn commit_other(&mut self, frame_type: FrameType, values: Vec<i64>, time_us: Option<i64>) {
        if let Some(slot) = self.history.slot_mut(frame_type) {
            slot.push(values.clone());
        }
        let row = ResolvedRow {
            index: self.last_iteration.unwrap_or(0),
            time_us,
            values,
        };
        self.tables.push_row(frame_type, row);
    }

    fn commit_main(&mut self, offset: usize, mut row: Vec<i64>, intra: bool, skipped: u64) {
        if let Some(i) = self.time_index {
            row[i] = self.apply_time_rollover(row[i]);
        }

        let check = !self.options.raw && self.options.validate_frames;
        if intra {
            if check && self.last_iteration.is_some() && !self.validate_main_frame(&row) {
                self.invalidate_main_stream(offset);
            } else {
                self.main_stream_valid = true;
            }
        } else if self.main_stream_valid && check && !self.validate_main_frame(&row) {
            self.invalidate_main_stream(offset);
        }

        if !self.main_stream_valid {
            self.stats.invalid_frames += 1;
            return;
        }

        let iteration = self.iteration_of(&row);
        let time_us = self.time_index.map(|i| row[i]);
        self.last_iteration = Some(iteration);
        if time_us.is_some() {
            self.last_time = time_us;
        }

        if intra {
            self.stats.i_frames += 1;
            self.history.main.reseed(row.clone());
        } else {
            self.stats.p_frames += 1;
            self.stats.skipped_iterations += skipped;
            self.history.main.push(row.clone());
        }

        self.tables.push_row(
            if intra {
                FrameType::Intra
            } else {
                FrameType::Inter
            },
            ResolvedRow {
                index: iteration,
                time_us,
                values: row,
            },
        );
    }

    fn commit_event(&mut self, offset: usize, mut event: LogEvent) {
        self.stats.e_frames += 1;
        let mut time_us = self.last_time;

        match &mut event {
            LogEvent::SyncBeep { time_us: t } => {
                *t += self.time_rollover_accumulator;
                time_us = Some(*t);
            }
            LogEvent::LoggingResume {
                iteration,
                time_us: t,
            } => {
                *t += self.time_rollover_accumulator;
                // Accept the jump to the resumed position
                self.last_iteration = Some(*iteration);
                self.last_time = Some(*t);
                time_us = Some(*t);
            }
            LogEvent::LogEnd => self.log_ended = true,
            _ => {}
        }

        debug!(offset, event = event.name(), "event");
        self.tables.push_event(EventRecord {
            event,
            iteration: self.last_iteration,
            time_us,
            offset,
        });
    }

    fn iteration_of(&self, row: &[i64]) -> u64 {
        match self.iteration_index {
            Some(i) => row[i] as u32 as u64,
            None => self.tables.main_rows() as u64,
        }
    }

    /// Reject frames whose iteration or time jumps implausibly
    fn validate_main_frame(&self, row: &[i64]) -> bool {
        let iteration = self.iteration_of(row);
        let iteration_ok = match self.last_iteration {
            Some(last) => {
                iteration >= last && iteration < last + MAXIMUM_ITERATION_JUMP_BETWEEN_FRAMES
            }
            None => true,
        };
        let time_ok = match (self.time_index.map(|i| row[i]), self.last_time) {
            (Some(time), Some(last)) => {
                time >= last && time < last + MAXIMUM_TIME_JUMP_BETWEEN_FRAMES
            }
            _ => true,
        };
        iteration_ok && time_ok
    }

    fn invalidate_main_stream(&mut self, offset: usize) {
        if self.main_stream_valid {
            warn!(offset, "main stream invalidated, waiting for next I frame");
        }
        self.main_stream_valid = false;
        self.history.main.invalidate();
    }

    /// Extend a 32-bit logger time with the rollover accumulator
    fn apply_time_rollover(&mut self, time: i64) -> i64 {
        let time32 = time as u32;
        if let Some(last) = self.last_time {
            let last32 = last as u32;
            if time32 < last32
                && (time32.wrapping_sub(last32) as i64) < MAXIMUM_TIME_JUMP_BETWEEN_FRAMES
            {
                self.time_rollover_accumulator += 1 << 32;
            }
        }
        time32 as i64 + self.time_rollover_accumulator
    }

    /// Skip forward from a failed frame to the next byte that can start one
    pub fn resync(&mut self, cursor: &mut ByteCursor, frame_start: usize) -> Resync {
        self.invalidate_main_stream(frame_start);

        let scan_start = frame_start + 1;
        cursor.seek(scan_start);
        loop {
            let scanned = cursor.position() - scan_start;
            match cursor.peek_byte() {
                Some(_) if scanned > self.options.max_resync_distance => break,
                Some(byte) if self.header.accepts_marker(byte) => {
                    if scanned > 0 {
                        debug!(offset = cursor.position(), scanned, "resynchronised");
                    }
                    return Resync::Recovered(scanned);
                }
                Some(_) => cursor.seek(cursor.position() + 1),
                None => break,
            }
        }

        Resync::Fatal(DecodeError::FrameResyncFailed {
            offset: frame_start,
            scanned: cursor.position() - scan_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::header::parse_header;

    const HEADER: &str = "H Product:Blackbox flight data recorder by Nicholas Sherlock\n\
        H Data version:2\n\
        H Field I name:loopIteration,time,value\n\
        H Field I signed:0,0,1\n\
        H Field I predictor:0,0,0\n\
        H Field I encoding:1,1,0\n\
        H Field P predictor:6,2,1\n\
        H Field P encoding:9,0,0\n";

    fn header() -> LogHeader {
        parse_header(&mut ByteCursor::new(HEADER.as_bytes())).expect("header")
    }

    fn run(header: &LogHeader, frames: &[u8], options: &DecodeOptions) -> FrameRun {
        FrameParser::new(header, options).run(&mut ByteCursor::new(frames))
    }

    fn values(run: &FrameRun) -> Vec<Vec<i64>> {
        let log = run.tables.clone().finish(
            0,
            0..0,
            header(),
            FrameStats::default(),
            None,
        );
        log.main.rows.into_iter().map(|r| r.values).collect()
    }

    #[test]
    fn test_i_then_p() {
        let header = header();
        // I: iter 0, time 1000, value 5; P: time delta 0 -> straight line, value +1
        let frames = [b'I', 0x00, 0xE8, 0x07, 0x0A, b'P', 0x00, 0x02];
        let run = run(&header, &frames, &DecodeOptions::default());
        assert_eq!(values(&run), vec![vec![0, 1000, 5], vec![1, 1000, 6]]);
        assert_eq!(run.stats.i_frames, 1);
        assert_eq!(run.stats.p_frames, 1);
        assert!(run.termination.is_none());
    }

    #[test]
    fn test_p_without_i_is_discarded() {
        let header = header();
        let frames = [b'P', 0x00, 0x02, b'I', 0x00, 0xE8, 0x07, 0x0A];
        let run = run(&header, &frames, &DecodeOptions::default());
        assert_eq!(values(&run), vec![vec![0, 1000, 5]]);
        assert_eq!(run.stats.invalid_frames, 1);
    }

    #[test]
    fn test_backwards_iteration_invalidates_stream() {
        let header = header();
        let frames = [
            b'I', 0x0A, 0xE8, 0x07, 0x00, // iteration 10
            b'I', 0x02, 0xE8, 0x07, 0x00, // iteration 2: rejected
            b'P', 0x00, 0x00, // discarded while invalid
        ];
        let run = run(&header, &frames, &DecodeOptions::default());
        assert_eq!(values(&run).len(), 1);
        assert_eq!(run.stats.invalid_frames, 2);

        let lenient = DecodeOptions {
            validate_frames: false,
            ..Default::default()
        };
        let run = self::run(&header, &frames, &lenient);
        assert_eq!(values(&run).len(), 3);
    }

    #[test]
    fn test_time_rollover() {
        let header = header();
        let mut parser = FrameParser::new(&header, &DecodeOptions::default());
        parser.last_time = Some(0xFFFF_FF00);
        assert_eq!(parser.apply_time_rollover(0x100), (1i64 << 32) + 0x100);
        parser.last_time = Some((1i64 << 32) + 0x100);
        assert_eq!(parser.apply_time_rollover(0x200), (1i64 << 32) + 0x200);
    }

    #[test]
    fn test_resync_skips_to_marker() {
        let header = header();
        let mut parser = FrameParser::new(&header, &DecodeOptions::default());
        let data = [b'x', 0x01, 0x02, b'I'];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(parser.resync(&mut cursor, 0), Resync::Recovered(2));
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_resync_gives_up() {
        let header = header();
        let options = DecodeOptions {
            max_resync_distance: 4,
            ..Default::default()
        };
        let mut parser = FrameParser::new(&header, &options);
        let data = [0u8; 16];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            parser.resync(&mut cursor, 0),
            Resync::Fatal(DecodeError::FrameResyncFailed {
                offset: 0,
                scanned: 5
            })
        );

        let data = [b'x', 0x01];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(
            parser.resync(&mut cursor, 0),
            Resync::Fatal(DecodeError::FrameResyncFailed {
                offset: 0,
                scanned: 1
            })
        );
    }

    #[test]
    fn test_unknown_marker_is_skipped() {
        let header = header();
        let frames = [b'I', 0x00, 0xE8, 0x07, 0x0A, b'Z', b'I', 0x01, 0xE9, 0x07, 0x0C];
        let run = run(&header, &frames, &DecodeOptions::default());
        assert_eq!(values(&run), vec![vec![0, 1000, 5], vec![1, 1001, 6]]);
        assert_eq!(run.stats.corrupt_frames, 1);
        assert!(run.termination.is_none());
    }

    #[test]
    fn test_undefined_marker_is_unknown_frame_type() {
        let header = header();
        assert!(header.gps.is_none());
        let parser = FrameParser::new(&header, &DecodeOptions::default());
        let mut cursor = ByteCursor::new(b"ZG");
        assert_eq!(
            parser.parse_frame(&mut cursor),
            Err(DecodeError::UnknownFrameType {
                marker: b'Z',
                offset: 0
            })
        );
        assert_eq!(
            parser.parse_frame(&mut cursor),
            Err(DecodeError::UnknownFrameType {
                marker: b'G',
                offset: 1
            })
        );
    }

    #[test]
    fn test_log_end_stops_stream() {
        let header = header();
        let mut frames = vec![b'I', 0x00, 0xE8, 0x07, 0x0A, b'E', 0xFF];
        frames.extend_from_slice(b"End of log\0");
        frames.extend_from_slice(&[b'I', 0x01, 0xE9, 0x07, 0x0C]);
        let run = run(&header, &frames, &DecodeOptions::default());
        assert_eq!(values(&run).len(), 1);
        assert_eq!(run.stats.e_frames, 1);
    }

    #[test]
    fn test_raw_mode_keeps_deltas() {
        let header = header();
        let frames = [b'I', 0x00, 0xE8, 0x07, 0x0A, b'P', 0x00, 0x02];
        let raw = DecodeOptions {
            raw: true,
            ..Default::default()
        };
        let run = run(&header, &frames, &raw);
        // increment still applies, other P fields are raw deltas
        assert_eq!(values(&run), vec![vec![0, 1000, 5], vec![1, 0, 1]]);
    }
}
