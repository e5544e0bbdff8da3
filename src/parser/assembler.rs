use crate::error::DecodeError;
use crate::types::{
    DecodedLog, EventRecord, FrameStats, FrameTable, FrameType, LogHeader, ResolvedRow,
};
use std::ops::Range;

/// Collects resolved rows per frame type for one sub-log
#[derive(Debug, Clone)]
pub struct LogAssembler {
    main: FrameTable,
    gps: Option<FrameTable>,
    gps_home: Option<FrameTable>,
    slow: Option<FrameTable>,
    events: Vec<EventRecord>,
}

impl LogAssembler {
    /// One table per frame type the header defines
    pub fn new(header: &LogHeader) -> Self {
        let table = |frame_type: FrameType| {
            header
                .schema(frame_type)
                .map(|schema| FrameTable::new(frame_type, schema.names()))
        };
        Self {
            main: FrameTable::new(FrameType::Intra, header.intra.names()),
            gps: table(FrameType::Gps),
            gps_home: table(FrameType::GpsHome),
            slow: table(FrameType::Slow),
            events: Vec::new(),
        }
    }

    /// Append a row; rows of a frame type with no table are dropped
    pub fn push_row(&mut self, frame_type: FrameType, row: ResolvedRow) {
        let table = match frame_type {
            FrameType::Intra | FrameType::Inter => Some(&mut self.main),
            FrameType::Gps => self.gps.as_mut(),
            FrameType::GpsHome => self.gps_home.as_mut(),
            FrameType::Slow => self.slow.as_mut(),
            FrameType::Event => None,
        };
        if let Some(table) = table {
            table.rows.push(row);
        }
    }

    pub fn push_event(&mut self, record: EventRecord) {
        self.events.push(record);
    }

    pub fn main_rows(&self) -> usize {
        self.main.len()
    }

    pub fn finish(
        self,
        index: usize,
        range: Range<usize>,
        header: LogHeader,
        stats: FrameStats,
        termination: Option<DecodeError>,
    ) -> DecodedLog {
        DecodedLog {
            index,
            range,
            header,
            main: self.main,
            gps: self.gps,
            gps_home: self.gps_home,
            slow: self.slow,
            events: self.events,
            stats,
            termination,
        }
    }
}
