#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frame kinds found in the binary section of a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameType {
    /// `I`: absolute snapshot of the main fields
    Intra,
    /// `P`: main fields delta-coded against history
    Inter,
    /// `G`: GPS sample
    Gps,
    /// `H`: GPS home position
    GpsHome,
    /// `S`: slow telemetry (flight mode, state flags, failsafe)
    Slow,
    /// `E`: discrete event
    Event,
}

impl FrameType {
    pub const ALL: [FrameType; 6] = [
        FrameType::Intra,
        FrameType::Inter,
        FrameType::Gps,
        FrameType::GpsHome,
        FrameType::Slow,
        FrameType::Event,
    ];

    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'I' => Some(FrameType::Intra),
            b'P' => Some(FrameType::Inter),
            b'G' => Some(FrameType::Gps),
            b'H' => Some(FrameType::GpsHome),
            b'S' => Some(FrameType::Slow),
            b'E' => Some(FrameType::Event),
            _ => None,
        }
    }

    pub fn marker(self) -> u8 {
        match self {
            FrameType::Intra => b'I',
            FrameType::Inter => b'P',
            FrameType::Gps => b'G',
            FrameType::GpsHome => b'H',
            FrameType::Slow => b'S',
            FrameType::Event => b'E',
        }
    }

    pub fn as_char(self) -> char {
        self.marker() as char
    }

    /// I and P frames share the main field layout
    pub fn is_main(self) -> bool {
        matches!(self, FrameType::Intra | FrameType::Inter)
    }
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// How a field's decoded delta becomes its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Predictor {
    Zero,
    Previous,
    StraightLine,
    Average2,
    MinThrottle,
    Motor0,
    Increment,
    /// Offset from the GPS home coordinate on the given axis
    HomeCoord(usize),
    FifteenHundred,
    VbatRef,
    LastMainFrameTime,
    MinMotor,
}

impl Predictor {
    pub fn from_id(id: i64) -> Option<Self> {
        Some(match id {
            0 => Predictor::Zero,
            1 => Predictor::Previous,
            2 => Predictor::StraightLine,
            3 => Predictor::Average2,
            4 => Predictor::MinThrottle,
            5 => Predictor::Motor0,
            6 => Predictor::Increment,
            7 => Predictor::HomeCoord(0),
            8 => Predictor::FifteenHundred,
            9 => Predictor::VbatRef,
            10 => Predictor::LastMainFrameTime,
            11 => Predictor::MinMotor,
            _ => return None,
        })
    }

    /// Header id of this predictor
    pub fn id(self) -> i64 {
        match self {
            Predictor::Zero => 0,
            Predictor::Previous => 1,
            Predictor::StraightLine => 2,
            Predictor::Average2 => 3,
            Predictor::MinThrottle => 4,
            Predictor::Motor0 => 5,
            Predictor::Increment => 6,
            Predictor::HomeCoord(_) => 7,
            Predictor::FifteenHundred => 8,
            Predictor::VbatRef => 9,
            Predictor::LastMainFrameTime => 10,
            Predictor::MinMotor => 11,
        }
    }
}

/// Wire encoding of a field's delta
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Encoding {
    SignedVB,
    UnsignedVB,
    Neg14Bit,
    Tag8_8SVB,
    Tag2_3S32,
    Tag8_4S16,
    Null,
    Tag2_3SVariable,
}

impl Encoding {
    /// Byte-aligned encodings only; the Elias codes (4, 5, 11) are bit-level
    pub fn from_id(id: i64) -> Option<Self> {
        Some(match id {
            0 => Encoding::SignedVB,
            1 => Encoding::UnsignedVB,
            3 => Encoding::Neg14Bit,
            6 => Encoding::Tag8_8SVB,
            7 => Encoding::Tag2_3S32,
            8 => Encoding::Tag8_4S16,
            9 => Encoding::Null,
            10 => Encoding::Tag2_3SVariable,
            _ => return None,
        })
    }

    pub fn id(self) -> i64 {
        match self {
            Encoding::SignedVB => 0,
            Encoding::UnsignedVB => 1,
            Encoding::Neg14Bit => 3,
            Encoding::Tag8_8SVB => 6,
            Encoding::Tag2_3S32 => 7,
            Encoding::Tag8_4S16 => 8,
            Encoding::Null => 9,
            Encoding::Tag2_3SVariable => 10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::SignedVB => "SignedVB",
            Encoding::UnsignedVB => "UnsignedVB",
            Encoding::Neg14Bit => "Neg14Bit",
            Encoding::Tag8_8SVB => "Tag8_8SVB",
            Encoding::Tag2_3S32 => "Tag2_3S32",
            Encoding::Tag8_4S16 => "Tag8_4S16",
            Encoding::Null => "Null",
            Encoding::Tag2_3SVariable => "Tag2_3SVariable",
        }
    }

    /// Maximum number of fields sharing one tag, `None` for single-field encodings
    pub fn joint_width(self) -> Option<usize> {
        match self {
            Encoding::Tag8_4S16 => Some(4),
            Encoding::Tag2_3S32 | Encoding::Tag2_3SVariable => Some(3),
            Encoding::Tag8_8SVB => Some(8),
            _ => None,
        }
    }
}

/// One column of a frame type's layout
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldSpec {
    pub name: String,
    pub signed: bool,
    pub predictor: Predictor,
    pub encoding: Encoding,
    /// Storage width in bytes as logged; 8 disables 32-bit wrapping
    pub width: u8,
    /// Index into [`FrameSchema::groups`]
    pub group: usize,
}

/// A unit of work for the frame decoder: which fields one read produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldGroup {
    /// Counter field computed from history; consumes no bytes
    Increment { field: usize },
    Single { field: usize, encoding: Encoding },
    Joint {
        start: usize,
        len: usize,
        encoding: Encoding,
    },
}

impl FieldGroup {
    /// Field indexes covered by this group
    pub fn fields(&self) -> std::ops::Range<usize> {
        match *self {
            FieldGroup::Increment { field } | FieldGroup::Single { field, .. } => field..field + 1,
            FieldGroup::Joint { start, len, .. } => start..start + len,
        }
    }
}

/// Frozen field layout of one frame type
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameSchema {
    pub frame_type: FrameType,
    pub fields: Vec<FieldSpec>,
    pub groups: Vec<FieldGroup>,
}

impl FrameSchema {
    /// Build a schema and its read groups from ordered field specs
    ///
    /// `group` on the incoming specs is ignored and reassigned.
    pub fn new(frame_type: FrameType, mut fields: Vec<FieldSpec>) -> Self {
        let mut groups = Vec::new();
        let mut i = 0;

        while i < fields.len() {
            let field = &fields[i];
            let group = if field.predictor == Predictor::Increment {
                FieldGroup::Increment { field: i }
            } else {
                match field.encoding {
                    Encoding::Tag8_8SVB => {
                        // Runs of consecutive Tag8_8SVB fields share a tag byte
                        let len = fields[i..]
                            .iter()
                            .take(8)
                            .take_while(|f| f.encoding == Encoding::Tag8_8SVB)
                            .count();
                        FieldGroup::Joint {
                            start: i,
                            len,
                            encoding: Encoding::Tag8_8SVB,
                        }
                    }
                    encoding => match encoding.joint_width() {
                        Some(width) => FieldGroup::Joint {
                            start: i,
                            len: width.min(fields.len() - i),
                            encoding,
                        },
                        None => FieldGroup::Single { field: i, encoding },
                    },
                }
            };

            let range = group.fields();
            for spec in &mut fields[range.clone()] {
                spec.group = groups.len();
            }
            groups.push(group);
            i = range.end;
        }

        Self {
            frame_type,
            fields,
            groups,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// Last two resolved rows of one frame type
#[derive(Debug, Clone, Default)]
pub struct HistorySlot {
    previous: Option<Vec<i64>>,
    previous2: Option<Vec<i64>>,
}

impl HistorySlot {
    pub fn previous(&self) -> Option<&[i64]> {
        self.previous.as_deref()
    }

    pub fn previous2(&self) -> Option<&[i64]> {
        self.previous2.as_deref()
    }

    /// Shift: previous becomes previous-previous, `row` becomes previous
    pub fn push(&mut self, row: Vec<i64>) {
        self.previous2 = self.previous.take();
        self.previous = Some(row);
    }

    /// Both entries become `row` (after an I-frame)
    pub fn reseed(&mut self, row: Vec<i64>) {
        self.previous2 = Some(row.clone());
        self.previous = Some(row);
    }

    pub fn invalidate(&mut self) {
        self.previous = None;
        self.previous2 = None;
    }
}

/// Prediction history for one sub-log, owned by a single decode run
#[derive(Debug, Clone, Default)]
pub struct FrameHistory {
    pub main: HistorySlot,
    pub gps: HistorySlot,
    pub gps_home: HistorySlot,
    pub slow: HistorySlot,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, frame_type: FrameType) -> Option<&HistorySlot> {
        match frame_type {
            FrameType::Intra | FrameType::Inter => Some(&self.main),
            FrameType::Gps => Some(&self.gps),
            FrameType::GpsHome => Some(&self.gps_home),
            FrameType::Slow => Some(&self.slow),
            FrameType::Event => None,
        }
    }

    pub fn slot_mut(&mut self, frame_type: FrameType) -> Option<&mut HistorySlot> {
        match frame_type {
            FrameType::Intra | FrameType::Inter => Some(&mut self.main),
            FrameType::Gps => Some(&mut self.gps),
            FrameType::GpsHome => Some(&mut self.gps_home),
            FrameType::Slow => Some(&mut self.slow),
            FrameType::Event => None,
        }
    }
}
