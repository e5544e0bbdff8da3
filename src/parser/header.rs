//! Header preamble parsing
//!
//! The preamble is a run of `H key:value` lines. `Field <type> <directive>`
//! lines arrive separately per directive and are zipped by field index when
//! the header freezes at the first byte that does not start a header line.

use crate::error::{DecodeError, Result};
use crate::parser::stream::ByteCursor;
use crate::types::{
    Encoding, FieldSpec, FrameSchema, FrameType, LogHeader, Predictor, SystemConfig,
};
use std::collections::HashMap;
use tracing::debug;

const DEFAULT_FIELD_WIDTH: u8 = 4;

/// Where the header parser is in the preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// Expecting the next `H ` line
    Scanning,
    /// Accumulating a `Field <type> ...` list
    FieldDirective(FrameType),
    /// Storing a plain `key:value` entry
    ConfigDirective,
    /// Binary data reached; schemas are fixed
    Frozen,
}

/// Raw directive lists of one frame type, in header order
#[derive(Debug, Default)]
struct FieldDirectives {
    names: Option<Vec<String>>,
    signed: Option<Vec<i64>>,
    predictor: Option<Vec<i64>>,
    encoding: Option<Vec<i64>>,
    width: Option<Vec<i64>>,
}

impl FieldDirectives {
    fn is_referenced(&self) -> bool {
        self.names.is_some()
            || self.signed.is_some()
            || self.predictor.is_some()
            || self.encoding.is_some()
            || self.width.is_some()
    }
}

/// Builder fed one header line at a time
#[derive(Debug)]
pub struct HeaderParser {
    state: HeaderState,
    config: SystemConfig,
    directives: HashMap<FrameType, FieldDirectives>,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderParser {
    pub fn new() -> Self {
        Self {
            state: HeaderState::Scanning,
            config: SystemConfig::new(),
            directives: HashMap::new(),
        }
    }

    pub fn state(&self) -> HeaderState {
        self.state
    }

    /// Consume one header line, without its leading `H `
    ///
    /// The state afterwards reflects the kind of line just stored. Lines fed
    /// after [`freeze`](Self::freeze) are rejected.
    pub fn feed_line(&mut self, line: &str) -> Result<()> {
        if self.state == HeaderState::Frozen {
            return Err(DecodeError::HeaderAfterData {
                line: line.to_string(),
            });
        }
        let Some((key, value)) = line.split_once(':') else {
            self.state = HeaderState::Scanning;
            return Ok(());
        };
        let key = key.trim();
        let value = value.trim();

        match field_directive(key) {
            Some((frame_type, directive)) => {
                self.apply_field_directive(frame_type, directive, key, value)?;
                self.state = HeaderState::FieldDirective(frame_type);
            }
            None => self.state = HeaderState::ConfigDirective,
        }
        // Field directives are kept with the rest for setup listings
        self.config.insert(key, value);
        Ok(())
    }

    /// Mark the end of the preamble
    pub fn freeze(&mut self) {
        self.state = HeaderState::Frozen;
    }

    fn apply_field_directive(
        &mut self,
        frame_type: FrameType,
        directive: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let entry = self.directives.entry(frame_type).or_default();
        match directive {
            "name" => {
                entry.names = Some(
                    value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                );
            }
            "signed" => entry.signed = Some(parse_int_list(key, value)?),
            "predictor" => entry.predictor = Some(parse_int_list(key, value)?),
            "encoding" => entry.encoding = Some(parse_int_list(key, value)?),
            "width" => entry.width = Some(parse_int_list(key, value)?),
            _ => {}
        }
        Ok(())
    }

    /// Zip the directives into schemas, freezing first if still open
    pub fn into_header(mut self) -> Result<LogHeader> {
        self.freeze();
        let data_version = self.config.data_version();

        let intra_directives = self.directives.remove(&FrameType::Intra).unwrap_or_default();
        let names = intra_directives
            .names
            .clone()
            .ok_or(DecodeError::MissingFieldDefinition {
                frame_type: 'I',
                directive: "name",
            })?;
        let intra = build_schema(FrameType::Intra, &names, &intra_directives, None)?;

        let inter = match self.directives.remove(&FrameType::Inter) {
            Some(p) if p.is_referenced() => {
                Some(build_schema(FrameType::Inter, &names, &p, Some(&intra))?)
            }
            _ => None,
        };

        let mut optional = |frame_type: FrameType| -> Result<Option<FrameSchema>> {
            match self.directives.remove(&frame_type) {
                Some(d) if d.is_referenced() => {
                    let names = d.names.clone().ok_or(DecodeError::MissingFieldDefinition {
                        frame_type: frame_type.as_char(),
                        directive: "name",
                    })?;
                    Ok(Some(build_schema(frame_type, &names, &d, None)?))
                }
                _ => Ok(None),
            }
        };
        let gps = optional(FrameType::Gps)?.map(pair_home_coord_predictors);
        let gps_home = optional(FrameType::GpsHome)?;
        let slow = optional(FrameType::Slow)?;

        debug!(
            fields = intra.len(),
            has_p = inter.is_some(),
            has_gps = gps.is_some(),
            has_slow = slow.is_some(),
            data_version,
            firmware = self.config.firmware_revision().unwrap_or("unknown"),
            "header frozen"
        );

        Ok(LogHeader {
            config: self.config,
            intra,
            inter,
            gps,
            gps_home,
            slow,
            data_version,
        })
    }
}

/// Split `Field I predictor` into its frame type and directive
fn field_directive(key: &str) -> Option<(FrameType, &str)> {
    let rest = key.strip_prefix("Field ")?;
    let mut chars = rest.chars();
    let marker = chars.next()?;
    let directive = chars.as_str().strip_prefix(' ')?;
    if !marker.is_ascii() {
        return None;
    }
    let frame_type = FrameType::from_marker(marker as u8)?;
    if frame_type == FrameType::Event {
        return None;
    }
    Some((frame_type, directive.trim()))
}

fn parse_int_list(key: &str, value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| DecodeError::InvalidHeaderValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn check_len<T>(
    frame_type: FrameType,
    directive: &'static str,
    list: &[T],
    expected: usize,
) -> Result<()> {
    if list.len() != expected {
        return Err(DecodeError::FieldCountMismatch {
            frame_type: frame_type.as_char(),
            directive,
            expected,
            found: list.len(),
        });
    }
    Ok(())
}

/// Zip one frame type's directive lists into a schema
///
/// P frames take names, signedness and widths from the I schema.
fn build_schema(
    frame_type: FrameType,
    names: &[String],
    directives: &FieldDirectives,
    inherit: Option<&FrameSchema>,
) -> Result<FrameSchema> {
    let missing = |directive: &'static str| DecodeError::MissingFieldDefinition {
        frame_type: frame_type.as_char(),
        directive,
    };
    let predictors = directives.predictor.as_ref().ok_or_else(|| missing("predictor"))?;
    let encodings = directives.encoding.as_ref().ok_or_else(|| missing("encoding"))?;

    let count = names.len();
    check_len(frame_type, "predictor", predictors, count)?;
    check_len(frame_type, "encoding", encodings, count)?;
    if inherit.is_none() {
        if let Some(signed) = &directives.signed {
            check_len(frame_type, "signed", signed, count)?;
        }
        if let Some(width) = &directives.width {
            check_len(frame_type, "width", width, count)?;
        }
    }

    let mut fields = Vec::with_capacity(count);
    for (i, name) in names.iter().enumerate() {
        let predictor =
            Predictor::from_id(predictors[i]).ok_or_else(|| DecodeError::UnsupportedPredictor {
                frame_type: frame_type.as_char(),
                field: name.clone(),
                predictor: predictors[i],
            })?;
        let encoding =
            Encoding::from_id(encodings[i]).ok_or_else(|| DecodeError::UnsupportedEncoding {
                frame_type: frame_type.as_char(),
                field: name.clone(),
                encoding: encodings[i],
            })?;

        let (signed, width) = match inherit {
            Some(schema) => (schema.fields[i].signed, schema.fields[i].width),
            None => (
                directives
                    .signed
                    .as_ref()
                    .is_some_and(|s| s[i] != 0),
                directives
                    .width
                    .as_ref()
                    .map_or(DEFAULT_FIELD_WIDTH, |w| w[i].clamp(0, u8::MAX as i64) as u8),
            ),
        };

        fields.push(FieldSpec {
            name: name.clone(),
            signed,
            predictor,
            encoding,
            width,
            group: 0,
        });
    }

    Ok(FrameSchema::new(frame_type, fields))
}

/// The second of two consecutive home-coordinate predictors uses the second axis
fn pair_home_coord_predictors(mut schema: FrameSchema) -> FrameSchema {
    for i in 1..schema.fields.len() {
        if schema.fields[i - 1].predictor == Predictor::HomeCoord(0)
            && schema.fields[i].predictor == Predictor::HomeCoord(0)
        {
            schema.fields[i].predictor = Predictor::HomeCoord(1);
        }
    }
    schema
}

/// Read one header line after `H `, stopping at newline, NUL or end of data
fn read_line(cursor: &mut ByteCursor) -> String {
    let mut bytes = Vec::new();
    while let Ok(byte) = cursor.read_byte() {
        if byte == b'\n' || byte == 0 {
            break;
        }
        bytes.push(byte);
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse the header preamble at the cursor
///
/// Leaves the cursor on the first byte of binary data. An `H` not followed by
/// a space is a GPS home frame and is left unread.
pub fn parse_header(cursor: &mut ByteCursor) -> Result<LogHeader> {
    let mut parser = HeaderParser::new();

    while cursor.peek_byte() == Some(b'H') {
        let line_start = cursor.position();
        cursor.read_byte()?;
        if cursor.peek_byte() != Some(b' ') {
            cursor.seek(line_start);
            break;
        }
        cursor.read_byte()?;
        let line = read_line(cursor);
        parser.feed_line(&line)?;
    }

    parser.freeze();
    parser.into_header()
}
