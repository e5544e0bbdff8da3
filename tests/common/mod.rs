//! Byte-level builders for synthetic blackbox logs
#![allow(dead_code)]

pub const PRODUCT: &str = "Blackbox flight data recorder by Nicholas Sherlock";

/// Unsigned variable-byte encoding, 7 bits per byte, low group first
pub fn uvb(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

/// Zig-zag then unsigned variable-byte
pub fn svb(value: i64) -> Vec<u8> {
    let zigzag = ((value as i32) << 1) ^ ((value as i32) >> 31);
    uvb(zigzag as u32 as u64)
}

/// Text header assembled line by line
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    lines: Vec<String>,
}

impl HeaderBuilder {
    /// Product line plus `Data version:2`
    pub fn new() -> Self {
        Self {
            lines: vec![format!("H Product:{PRODUCT}"), "H Data version:2".to_string()],
        }
    }

    pub fn line(mut self, key: &str, value: &str) -> Self {
        self.lines.push(format!("H {key}:{value}"));
        self
    }

    pub fn field(self, frame_type: char, directive: &str, values: &str) -> Self {
        self.line(&format!("Field {frame_type} {directive}"), values)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for line in &self.lines {
            out.extend_from_slice(line.as_bytes());
            out.push(b'\n');
        }
        out
    }
}

/// Main frames with loop iteration, time, one signed value and two motors
///
/// P frames predict the iteration by increment, time by straight line, the
/// value from the previous frame and motors by the average of two.
pub fn motor_header() -> HeaderBuilder {
    motor_header_with_minthrottle(1070)
}

/// [`motor_header`] with a different `minthrottle`
pub fn motor_header_with_minthrottle(minthrottle: u64) -> HeaderBuilder {
    HeaderBuilder::new()
        .line("Firmware revision", "Betaflight 4.4.2 (025c6d3a1) STM32F7X2")
        .line("minthrottle", &minthrottle.to_string())
        .field('I', "name", "loopIteration,time,axisP[0],motor[0],motor[1]")
        .field('I', "signed", "0,0,1,0,0")
        .field('I', "predictor", "0,0,0,4,5")
        .field('I', "encoding", "1,1,0,1,0")
        .field('P', "predictor", "6,2,1,3,3")
        .field('P', "encoding", "9,0,0,0,0")
}

/// I frame for [`motor_header`] with motor[1] two below motor[0]
pub fn motor_intra(iteration: u64, time: u64, axis_p: i64, motor0: u64) -> Vec<u8> {
    let mut frame = vec![b'I'];
    frame.extend(uvb(iteration));
    frame.extend(uvb(time));
    frame.extend(svb(axis_p));
    frame.extend(uvb(motor0 - 1070));
    frame.extend(svb(-2));
    frame
}

/// P frame for [`motor_header`] with the given deltas for time, axisP and motors
pub fn motor_inter(deltas: [i64; 4]) -> Vec<u8> {
    let mut frame = vec![b'P'];
    for delta in deltas {
        frame.extend(svb(delta));
    }
    frame
}

pub fn log_end() -> Vec<u8> {
    let mut frame = vec![b'E', 255];
    frame.extend_from_slice(b"End of log\0");
    frame
}
