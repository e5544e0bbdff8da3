//! CLI binary for BBL Decoder
//!
//! Decodes blackbox files with the library and prints a summary per sub-log.

use anyhow::{Context, Result};
use bbl_decoder::{DecodeOptions, DecodedLog, FrameType, RawLog, DEFAULT_MAX_RESYNC_DISTANCE};
use clap::{Arg, ArgAction, ArgMatches, Command};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("bbl_decode")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(format!(
            "{} ({})",
            env!("CARGO_PKG_VERSION"),
            option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
        ))
        .about("Decode BBL blackbox log files and summarise each log")
        .arg(
            Arg::new("files")
                .help("BBL files to decode (.BBL, .BFL, .TXT extensions supported, case-insensitive, supports globbing)")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Keep encoded deltas instead of applying predictors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-validate")
                .long("no-validate")
                .help("Accept main frames with implausible iteration or time jumps")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-resync")
                .long("max-resync")
                .help("Bytes to scan for the next frame after a corrupt one")
                .value_name("BYTES")
                .value_parser(clap::value_parser!(usize))
                .default_value("4096"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print summaries as JSON lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bbl_decoder={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_ascii_lowercase();
            ext_lower == "bbl" || ext_lower == "bfl" || ext_lower == "txt"
        })
        .unwrap_or(false)
}

/// Expand globs and keep existing files with a supported extension
fn collect_paths(patterns: &[&String]) -> Vec<PathBuf> {
    let mut valid_paths = Vec::new();

    for pattern in patterns {
        let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
            match glob(pattern).map(|paths| paths.collect::<Result<Vec<_>, _>>()) {
                Ok(Ok(paths)) => {
                    debug!(pattern = %pattern, matched = paths.len(), "expanded glob");
                    paths
                }
                Ok(Err(e)) => {
                    eprintln!("Error expanding glob pattern '{pattern}': {e}");
                    continue;
                }
                Err(e) => {
                    eprintln!("Invalid glob pattern '{pattern}': {e}");
                    continue;
                }
            }
        } else {
            vec![PathBuf::from(pattern)]
        };

        for path in paths {
            if !path.exists() {
                eprintln!("Warning: File does not exist: {path:?}");
                continue;
            }
            if !has_supported_extension(&path) {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("none");
                eprintln!("Warning: Skipping file with unsupported extension '{ext}': {path:?}");
                continue;
            }
            valid_paths.push(path);
        }
    }

    valid_paths
}

fn options_from(matches: &ArgMatches) -> DecodeOptions {
    DecodeOptions {
        raw: matches.get_flag("raw"),
        validate_frames: !matches.get_flag("no-validate"),
        max_resync_distance: matches
            .get_one::<usize>("max-resync")
            .copied()
            .unwrap_or(DEFAULT_MAX_RESYNC_DISTANCE),
    }
}

fn print_summary(log: &DecodedLog, total_logs: usize) {
    let stats = &log.stats;
    println!("Log {} of {}", log.index + 1, total_logs);
    println!(
        "  Firmware: {}",
        log.header.config.firmware_revision().unwrap_or("unknown")
    );
    println!(
        "  Frames: I {} P {} G {} H {} S {} E {}",
        stats.i_frames, stats.p_frames, stats.g_frames, stats.h_frames, stats.s_frames, stats.e_frames
    );
    println!(
        "  Invalid: {}  Corrupt: {}  Resync bytes: {}",
        stats.invalid_frames, stats.corrupt_frames, stats.resync_bytes
    );
    println!(
        "  Main rows: {}  Duration: {:.3} s  Rate: {:.1} Hz",
        log.main.len(),
        log.duration_seconds(),
        log.sample_rate_hz()
    );
    for frame_type in [FrameType::Gps, FrameType::GpsHome, FrameType::Slow] {
        if let Some(table) = log.table(frame_type) {
            println!("  {} rows: {}", frame_type, table.len());
        }
    }
    if !log.events.is_empty() {
        println!("  Events: {}", log.events.len());
    }
    if let Some(err) = &log.termination {
        println!("  Ended early: {err}");
    }
}

#[cfg(feature = "json")]
fn print_json(path: &Path, log: &DecodedLog) -> Result<()> {
    let summary = serde_json::json!({
        "file": path.display().to_string(),
        "log": log.index + 1,
        "firmware": log.header.config.firmware_revision(),
        "main_rows": log.main.len(),
        "duration_us": log.duration_us(),
        "stats": &log.stats,
        "events": &log.events,
        "termination": log.termination.as_ref().map(|e| e.to_string()),
    });
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

#[cfg(not(feature = "json"))]
fn print_json(_path: &Path, _log: &DecodedLog) -> Result<()> {
    anyhow::bail!("--json requires the 'json' feature")
}

/// Decode one file; returns the number of sub-logs that decoded
fn process_file(path: &Path, options: &DecodeOptions, json: bool) -> Result<usize> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {path:?}"))?;
    let raw = RawLog::new(&data).with_context(|| format!("Failed to split {path:?}"))?;

    let mut decoded = 0;
    for result in decode(&raw, options) {
        match result {
            Ok(log) => {
                if json {
                    print_json(path, &log)?;
                } else {
                    print_summary(&log, raw.log_count());
                }
                decoded += 1;
            }
            Err(e) => {
                warn!(error = %e, "sub-log failed");
                eprintln!("Error: {e}");
            }
        }
    }

    Ok(decoded)
}

#[cfg(feature = "parallel")]
fn decode(raw: &RawLog, options: &DecodeOptions) -> Vec<bbl_decoder::Result<DecodedLog>> {
    raw.decode_all_parallel(options)
}

#[cfg(not(feature = "parallel"))]
fn decode(raw: &RawLog, options: &DecodeOptions) -> Vec<bbl_decoder::Result<DecodedLog>> {
    raw.decode_all(options)
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let options = options_from(&matches);
    let json = matches.get_flag("json");
    let file_patterns: Vec<&String> = matches
        .get_many::<String>("files")
        .map(|files| files.collect())
        .unwrap_or_default();

    let valid_paths = collect_paths(&file_patterns);
    if valid_paths.is_empty() {
        eprintln!("Error: No valid files found to process.");
        eprintln!("Supported extensions: .BBL, .BFL, .TXT (case-insensitive)");
        eprintln!("Input patterns were: {file_patterns:?}");
        std::process::exit(1);
    }

    let mut processed_files = 0;
    for (index, path) in valid_paths.iter().enumerate() {
        if index > 0 && !json {
            println!();
        }
        if !json {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown");
            println!("Processing: {filename}");
        }

        match process_file(path, &options, json) {
            Ok(0) => eprintln!("No logs decoded from {path:?}"),
            Ok(_) => processed_files += 1,
            Err(e) => {
                eprintln!("Error processing {path:?}: {e:#}");
                eprintln!("Continuing with next file...");
            }
        }
    }

    if processed_files == 0 {
        eprintln!(
            "Error: No files were successfully processed out of {} files found.",
            valid_paths.len()
        );
        std::process::exit(1);
    }

    Ok(())
}
