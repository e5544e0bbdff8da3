//! Error types for blackbox decoding
//!
//! Every offset carried by an error is an absolute byte offset into the
//! file buffer handed to [`RawLog`](crate::RawLog).

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Errors produced while decoding a blackbox file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DecodeError {
    // === Stream errors ===
    /// The cursor ran out of bytes in the middle of a read
    #[error("unexpected end of data at offset {offset}")]
    EndOfData { offset: usize },

    /// A variable-length integer did not terminate within its byte limit
    #[error("variable-length integer at offset {offset} did not terminate")]
    MalformedVarint { offset: usize },

    /// A joint codec tag selected a case that is not defined for its group
    #[error("invalid {encoding} tag 0x{tag:02X} at offset {offset}")]
    InvalidTag {
        encoding: &'static str,
        tag: u8,
        offset: usize,
    },

    // === Header errors ===
    /// A frame type was referenced but one of its required directives is missing
    #[error("missing header directive 'Field {frame_type} {directive}'")]
    MissingFieldDefinition {
        frame_type: char,
        directive: &'static str,
    },

    /// Zipped field directive lists differ in length
    #[error(
        "'Field {frame_type} {directive}' lists {found} values but {expected} fields are named"
    )]
    FieldCountMismatch {
        frame_type: char,
        directive: &'static str,
        expected: usize,
        found: usize,
    },

    /// The field uses an encoding this decoder cannot read at byte granularity
    #[error("field '{field}' of {frame_type} frames uses unsupported encoding {encoding}")]
    UnsupportedEncoding {
        frame_type: char,
        field: String,
        encoding: i64,
    },

    /// The field uses a predictor id outside the known set
    #[error("field '{field}' of {frame_type} frames uses unknown predictor {predictor}")]
    UnsupportedPredictor {
        frame_type: char,
        field: String,
        predictor: i64,
    },

    /// A header value could not be interpreted
    #[error("invalid header value for '{key}': {value:?}")]
    InvalidHeaderValue { key: String, value: String },

    /// A header line was offered after the header had been frozen
    #[error("header line {line:?} after the start of binary data")]
    HeaderAfterData { line: String },

    // === Frame errors ===
    /// A byte in frame position is not a known frame marker for this log
    #[error("unknown frame marker 0x{marker:02X} at offset {offset}")]
    UnknownFrameType { marker: u8, offset: usize },

    /// An event frame carried an event id with no known payload layout
    #[error("unknown event type {event_type} at offset {offset}")]
    UnknownEvent { event_type: u8, offset: usize },

    /// A frame decoded but its contents are not usable
    #[error("corrupt {frame_type} frame at offset {offset}: {reason}")]
    CorruptFrame {
        frame_type: char,
        offset: usize,
        reason: &'static str,
    },

    /// No frame marker was found within the resync window after a corrupt frame
    #[error("frame resync failed at offset {offset} after scanning {scanned} bytes")]
    FrameResyncFailed { offset: usize, scanned: usize },

    // === File errors ===
    /// The buffer contains no blackbox header at all
    #[error("no blackbox log headers found")]
    NoLogsFound,

    /// An error scoped to one sub-log of the file
    #[error("log {index}: {source}")]
    SubLog {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Attach the sub-log index to this error
    #[must_use]
    pub fn in_log(self, index: usize) -> Self {
        match self {
            already @ Self::SubLog { .. } => already,
            other => Self::SubLog {
                index,
                source: Box::new(other),
            },
        }
    }

    /// The error with any sub-log wrapper removed
    pub fn root(&self) -> &DecodeError {
        match self {
            Self::SubLog { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for errors raised while interpreting the text header
    pub fn is_header_error(&self) -> bool {
        matches!(
            self.root(),
            Self::MissingFieldDefinition { .. }
                | Self::FieldCountMismatch { .. }
                | Self::UnsupportedEncoding { .. }
                | Self::UnsupportedPredictor { .. }
                | Self::InvalidHeaderValue { .. }
                | Self::HeaderAfterData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
