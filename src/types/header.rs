use crate::types::frame::{FrameSchema, FrameType};
use semver::Version;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A configuration header value, typed on insertion
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConfigValue {
    Int(i64),
    IntList(Vec<i64>),
    Text(String),
}

impl ConfigValue {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(value) = raw.parse::<i64>() {
            return ConfigValue::Int(value);
        }
        if raw.contains(',') {
            let list: Result<Vec<i64>, _> = raw.split(',').map(|s| s.trim().parse()).collect();
            if let Ok(list) = list {
                return ConfigValue::IntList(list);
            }
        }
        ConfigValue::Text(raw.to_string())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// List view; a single integer is a list of one
    pub fn as_int_list(&self) -> Option<&[i64]> {
        match self {
            ConfigValue::Int(v) => Some(std::slice::from_ref(v)),
            ConfigValue::IntList(v) => Some(v),
            ConfigValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Firmware family that wrote the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FirmwareType {
    Unknown,
    Baseflight,
    Cleanflight,
    Betaflight,
    Inav,
    EmuFlight,
}

/// I/P sampling ratios from `I interval` and `P interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameIntervals {
    pub i_interval: u32,
    pub p_num: u32,
    pub p_denom: u32,
}

impl Default for FrameIntervals {
    fn default() -> Self {
        Self {
            i_interval: 32,
            p_num: 1,
            p_denom: 1,
        }
    }
}

/// PID gains for one axis as logged (P, I, D)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidGains {
    pub p: i64,
    pub i: i64,
    pub d: i64,
}

/// Every `H key:value` line of one sub-log
///
/// Values are kept verbatim in header order and typed for lookup; a repeated
/// key keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemConfig {
    values: HashMap<String, ConfigValue>,
    raw_headers: Vec<(String, String)>,
}

impl SystemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, raw_value: &str) {
        let key = key.trim();
        let raw_value = raw_value.trim();
        self.raw_headers
            .push((key.to_string(), raw_value.to_string()));
        self.values
            .insert(key.to_string(), ConfigValue::parse(raw_value));
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_int()
    }

    pub fn get_int_list(&self, key: &str) -> Option<&[i64]> {
        self.get(key)?.as_int_list()
    }

    /// The value as written in the header, whatever its type
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.raw_headers
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn raw_headers(&self) -> &[(String, String)] {
        &self.raw_headers
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    // === Firmware identity ===

    pub fn firmware_revision(&self) -> Option<&str> {
        self.raw("Firmware revision")
    }

    pub fn firmware_type(&self) -> FirmwareType {
        if let Some(revision) = self.firmware_revision() {
            let lower = revision.to_lowercase();
            if lower.starts_with("betaflight") {
                return FirmwareType::Betaflight;
            }
            if lower.starts_with("emuflight") {
                return FirmwareType::EmuFlight;
            }
            if lower.starts_with("inav") {
                return FirmwareType::Inav;
            }
        }
        match self.raw("Firmware type") {
            Some("Cleanflight") => FirmwareType::Cleanflight,
            Some(_) => FirmwareType::Baseflight,
            None => FirmwareType::Unknown,
        }
    }

    /// Semantic version following the firmware name in the revision string
    ///
    /// Parses strings like "Betaflight 4.5.1 (77d01ba3b) AT32F435M".
    pub fn firmware_version(&self) -> Option<Version> {
        let words: Vec<&str> = self.firmware_revision()?.split_whitespace().collect();
        words
            .windows(2)
            .find_map(|pair| Version::parse(pair[1]).ok())
    }

    pub fn data_version(&self) -> i64 {
        self.get_int("Data version").unwrap_or(0)
    }

    pub fn log_start_datetime(&self) -> Option<&str> {
        self.raw("Log start datetime")
    }

    // === Timing ===

    pub fn looptime(&self) -> Option<i64> {
        self.get_int("looptime")
    }

    pub fn frame_intervals(&self) -> FrameIntervals {
        let mut intervals = FrameIntervals::default();
        if let Some(i_interval) = self.get_int("I interval") {
            intervals.i_interval = i_interval.clamp(1, u32::MAX as i64) as u32;
        }
        if let Some((num, denom)) = self
            .raw("P interval")
            .and_then(|value| value.split_once('/'))
        {
            if let (Ok(num), Ok(denom)) = (num.trim().parse::<u32>(), denom.trim().parse::<u32>())
            {
                if denom > 0 {
                    intervals.p_num = num;
                    intervals.p_denom = denom;
                }
            }
        }
        intervals
    }

    // === Motor and throttle ranges ===

    pub fn minthrottle(&self) -> i64 {
        self.get_int("minthrottle").unwrap_or(1150)
    }

    pub fn maxthrottle(&self) -> i64 {
        self.get_int("maxthrottle").unwrap_or(1850)
    }

    /// `motorOutput` low end, falling back to minthrottle
    pub fn motor_output_low(&self) -> i64 {
        self.get_int_list("motorOutput")
            .and_then(|v| v.first().copied())
            .unwrap_or_else(|| self.minthrottle())
    }

    pub fn motor_output_high(&self) -> i64 {
        self.get_int_list("motorOutput")
            .and_then(|v| v.get(1).copied())
            .unwrap_or_else(|| self.maxthrottle())
    }

    // === Battery and sensors ===

    pub fn vbatref(&self) -> i64 {
        self.get_int("vbatref").unwrap_or(4095)
    }

    pub fn vbatscale(&self) -> i64 {
        self.get_int("vbatscale").unwrap_or(110)
    }

    /// (min, warning, max) cell voltage in 0.1V
    pub fn vbat_cell_voltage(&self) -> (i64, i64, i64) {
        match self.get_int_list("vbatcellvoltage") {
            Some(&[min, warning, max, ..]) => (min, warning, max),
            _ => (33, 35, 43),
        }
    }

    /// (offset, scale) of the current sensor
    pub fn current_meter(&self) -> (i64, i64) {
        match self.get_int_list("currentMeter") {
            Some(&[offset, scale, ..]) => (offset, scale),
            _ => (0, 400),
        }
    }

    pub fn acc_1g(&self) -> i64 {
        self.get_int("acc_1G").unwrap_or(1)
    }

    /// Gyro scale in radians per microsecond per LSB
    ///
    /// The header stores IEEE-754 bits as hex. Baseflight logs already carry
    /// the final unit.
    pub fn gyro_scale(&self) -> f64 {
        let raw = self.raw("gyro_scale").or_else(|| self.raw("gyro.scale"));
        let scale = raw
            .and_then(|value| {
                let hex = value.trim_start_matches("0x").trim_start_matches("0X");
                u32::from_str_radix(hex, 16).ok()
            })
            .map(|bits| f32::from_bits(bits) as f64)
            .unwrap_or(1.0);

        if self.firmware_type() == FirmwareType::Baseflight {
            scale
        } else {
            scale * (std::f64::consts::PI / 180.0) * 0.000001
        }
    }

    // === Tuning ===

    /// (rcRate, yawRate)
    pub fn rates(&self) -> (i64, i64) {
        (
            self.get_int("rcRate").unwrap_or(90),
            self.get_int("yawRate").unwrap_or(0),
        )
    }

    /// Roll/pitch/yaw gains from `rollPID`, `pitchPID` and `yawPID`
    pub fn pid_gains(&self) -> Option<[PidGains; 3]> {
        let axis = |key: &str| match self.get_int_list(key) {
            Some(&[p, i, d, ..]) => Some(PidGains { p, i, d }),
            _ => None,
        };
        Some([axis("rollPID")?, axis("pitchPID")?, axis("yawPID")?])
    }
}

/// Frozen header of one sub-log: schemas plus configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LogHeader {
    pub config: SystemConfig,
    pub intra: FrameSchema,
    pub inter: Option<FrameSchema>,
    pub gps: Option<FrameSchema>,
    pub gps_home: Option<FrameSchema>,
    pub slow: Option<FrameSchema>,
    pub data_version: i64,
}

impl LogHeader {
    pub fn schema(&self, frame_type: FrameType) -> Option<&FrameSchema> {
        match frame_type {
            FrameType::Intra => Some(&self.intra),
            FrameType::Inter => self.inter.as_ref(),
            FrameType::Gps => self.gps.as_ref(),
            FrameType::GpsHome => self.gps_home.as_ref(),
            FrameType::Slow => self.slow.as_ref(),
            FrameType::Event => None,
        }
    }

    /// True if a frame starting with `marker` can appear in this log
    pub fn accepts_marker(&self, marker: u8) -> bool {
        match FrameType::from_marker(marker) {
            Some(FrameType::Event) | Some(FrameType::Intra) => true,
            Some(frame_type) => self.schema(frame_type).is_some(),
            None => false,
        }
    }

    pub fn main_field_names(&self) -> Vec<String> {
        self.intra.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(lines: &[(&str, &str)]) -> SystemConfig {
        let mut config = SystemConfig::new();
        for (key, value) in lines {
            config.insert(key, value);
        }
        config
    }

    #[test]
    fn test_value_typing() {
        assert_eq!(ConfigValue::parse(" 125 "), ConfigValue::Int(125));
        assert_eq!(
            ConfigValue::parse("48,2047"),
            ConfigValue::IntList(vec![48, 2047])
        );
        assert_eq!(
            ConfigValue::parse("1/2"),
            ConfigValue::Text("1/2".to_string())
        );
        assert_eq!(ConfigValue::parse("-3").as_int_list(), Some(&[-3][..]));
    }

    #[test]
    fn test_defaults_when_absent() {
        let config = SystemConfig::new();
        assert_eq!(config.minthrottle(), 1150);
        assert_eq!(config.vbatref(), 4095);
        assert_eq!(config.motor_output_low(), 1150);
        assert_eq!(config.frame_intervals(), FrameIntervals::default());
        assert_eq!(config.firmware_type(), FirmwareType::Unknown);
        assert_eq!(config.pid_gains(), None);
    }

    #[test]
    fn test_firmware_identity() {
        let config = config(&[
            ("Firmware type", "Cleanflight"),
            ("Firmware revision", "Betaflight 4.5.1 (77d01ba3b) AT32F435M"),
        ]);
        assert_eq!(config.firmware_type(), FirmwareType::Betaflight);
        assert_eq!(config.firmware_version(), Some(Version::new(4, 5, 1)));

        let config = self::config(&[("Firmware type", "Cleanflight")]);
        assert_eq!(config.firmware_type(), FirmwareType::Cleanflight);
        assert_eq!(config.firmware_version(), None);
    }

    #[test]
    fn test_motor_and_intervals() {
        let config = config(&[
            ("minthrottle", "1070"),
            ("motorOutput", "48,2047"),
            ("I interval", "32"),
            ("P interval", "1/2"),
            ("rollPID", "45,80,30"),
            ("pitchPID", "47,84,34"),
            ("yawPID", "45,80,0"),
        ]);
        assert_eq!(config.motor_output_low(), 48);
        assert_eq!(config.motor_output_high(), 2047);
        assert_eq!(
            config.frame_intervals(),
            FrameIntervals {
                i_interval: 32,
                p_num: 1,
                p_denom: 2
            }
        );
        let gains = config.pid_gains().expect("gains");
        assert_eq!(gains[1], PidGains { p: 47, i: 84, d: 34 });
    }

    #[test]
    fn test_gyro_scale_from_hex_bits() {
        let bits = format!("0x{:08x}", 1.0f32.to_bits());
        let config = config(&[("Firmware type", "Cleanflight"), ("gyro_scale", bits.as_str())]);
        let expected = std::f64::consts::PI / 180.0 * 0.000001;
        assert!((config.gyro_scale() - expected).abs() < 1e-15);

        let config = self::config(&[("Firmware type", "Baseflight"), ("gyro_scale", bits.as_str())]);
        assert_eq!(config.gyro_scale(), 1.0);
    }

    #[test]
    fn test_repeated_key_keeps_last() {
        let config = config(&[("looptime", "500"), ("looptime", "125")]);
        assert_eq!(config.looptime(), Some(125));
        assert_eq!(config.raw_headers().len(), 2);
        assert_eq!(config.raw("looptime"), Some("125"));
    }
}
