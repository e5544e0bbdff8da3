pub mod assembler;
pub mod decoder;
pub mod event;
pub mod frame;
pub mod header;
pub mod helpers;
pub mod joint;
pub mod main;
pub mod predictor;
pub mod primitive;
pub mod stream;

pub use assembler::LogAssembler;
pub use decoder::{decode_field_value, decode_frame_deltas, decode_group};
pub use event::parse_event;
pub use frame::{FrameParser, FrameRun, ParsedFrame, Resync};
pub use header::{parse_header, HeaderParser, HeaderState};
pub use main::{decode_logs, DecodeOptions, RawLog, DEFAULT_MAX_RESYNC_DISTANCE, LOG_START_MARKER};
pub use predictor::{PredictionInputs, PredictorEngine};
pub use stream::ByteCursor;
