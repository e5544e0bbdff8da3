//! BBL Decoder Library
//!
//! A Rust library for decoding Betaflight/Cleanflight/INAV blackbox log files
//! into per-frame-type tables of resolved integer values.
//!
//! A file is split into sub-logs (one per arm cycle). Each sub-log's text
//! header defines the field layout of its binary frames; frames are then
//! decoded, predicted against history and collected into a [`DecodedLog`].
//! Corrupt frames are skipped by scanning for the next frame marker.
//!
//! # Features
//!
//! - **`cli`** (default): Build the `bbl_decode` command-line binary
//! - **`serde`**: Derive `Serialize` on decoded data types
//! - **`json`**: JSON summaries in the CLI (implies `serde`)
//! - **`parallel`**: Decode sub-logs on a rayon thread pool
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bbl_decoder::{DecodeOptions, RawLog};
//!
//! let data = std::fs::read("flight.BBL")?;
//! let raw = RawLog::new(&data)?;
//! for log in raw.decode_all(&DecodeOptions::default()) {
//!     let log = log?;
//!     println!("log {}: {} main rows", log.index + 1, log.main.len());
//!     if let Some(gyro) = log.main.column("gyroADC[0]") {
//!         println!("first gyro sample: {:?}", gyro.first());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Public API
//!
//! ## Decoding
//! - [`RawLog`] - Split a file buffer into sub-logs and decode them
//! - [`decode_logs`] - One-call split and decode
//! - [`DecodeOptions`] - Raw mode, frame validation and resync bound
//!
//! ## Data Types
//! - [`DecodedLog`] - Tables, events, stats and header of one sub-log
//! - [`FrameTable`] / [`ResolvedRow`] - Decoded rows of one frame type
//! - [`LogHeader`] / [`SystemConfig`] - Field schemas and typed header values
//! - [`LogEvent`] - Decoded E-frame payloads
//! - [`DecodeError`] - Everything that can go wrong

pub mod error;
pub mod parser;
pub mod skipped_frames;
pub mod types;

pub use error::{DecodeError, Result};
pub use parser::{decode_logs, DecodeOptions, RawLog, DEFAULT_MAX_RESYNC_DISTANCE};
pub use types::*;
