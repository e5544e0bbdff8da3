//! Field prediction
//!
//! Turns the deltas of one frame into resolved values. Fields are resolved in
//! order because `Motor0` reads a sibling already resolved in the same frame.

use crate::types::{Encoding, FieldGroup, FieldSpec, FrameSchema, LogHeader, Predictor};

/// History and context a frame is predicted against
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionInputs<'a> {
    pub previous: Option<&'a [i64]>,
    pub previous2: Option<&'a [i64]>,
    /// Last GPS home row
    pub gps_home: Option<&'a [i64]>,
    /// Time of the last accepted main frame
    pub last_main_time: Option<i64>,
    /// Iterations intentionally not logged since the previous main frame
    pub skipped_frames: u64,
}

/// Predictor constants and well-known field positions of one sub-log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorEngine {
    minthrottle: i64,
    vbatref: i64,
    motor_output_low: i64,
    motor0_index: Option<usize>,
    home_indexes: [Option<usize>; 2],
}

impl PredictorEngine {
    pub fn from_header(header: &LogHeader) -> Self {
        let home_index = |name: &str| header.gps_home.as_ref().and_then(|s| s.index_of(name));
        Self {
            minthrottle: header.config.minthrottle(),
            vbatref: header.config.vbatref(),
            motor_output_low: header.config.motor_output_low(),
            motor0_index: header.intra.index_of("motor[0]"),
            home_indexes: [home_index("GPS_home[0]"), home_index("GPS_home[1]")],
        }
    }

    /// Resolve one field from its delta
    ///
    /// `current` holds this frame's fields; entries before `field_index` are
    /// already resolved.
    pub fn resolve(
        &self,
        predictor: Predictor,
        field_index: usize,
        delta: i64,
        current: &[i64],
        inputs: &PredictionInputs,
    ) -> i64 {
        let previous = inputs.previous.map(|row| row[field_index]);
        let previous2 = inputs.previous2.map(|row| row[field_index]);

        match predictor {
            Predictor::Zero => delta,
            Predictor::Previous => delta.wrapping_add(previous.unwrap_or(0)),
            Predictor::StraightLine => match (previous, previous2) {
                (Some(prev), Some(prev2)) => {
                    delta.wrapping_add(prev.wrapping_mul(2).wrapping_sub(prev2))
                }
                _ => delta.wrapping_add(previous.unwrap_or(0)),
            },
            Predictor::Average2 => match (previous, previous2) {
                (Some(prev), Some(prev2)) => {
                    delta.wrapping_add(prev.wrapping_add(prev2).div_euclid(2))
                }
                _ => delta.wrapping_add(previous.unwrap_or(0)),
            },
            Predictor::MinThrottle => delta.wrapping_add(self.minthrottle),
            Predictor::Motor0 => {
                let motor0 = self
                    .motor0_index
                    .and_then(|i| current.get(i).copied())
                    .unwrap_or(0);
                delta.wrapping_add(motor0)
            }
            Predictor::Increment => previous
                .unwrap_or(0)
                .wrapping_add(1)
                .wrapping_add(inputs.skipped_frames as i64),
            Predictor::HomeCoord(axis) => {
                let home = self
                    .home_indexes
                    .get(axis)
                    .copied()
                    .flatten()
                    .zip(inputs.gps_home)
                    .and_then(|(i, row)| row.get(i).copied())
                    .unwrap_or(0);
                delta.wrapping_add(home)
            }
            Predictor::FifteenHundred => delta.wrapping_add(1500),
            Predictor::VbatRef => delta.wrapping_add(self.vbatref),
            Predictor::LastMainFrameTime => delta.wrapping_add(inputs.last_main_time.unwrap_or(0)),
            Predictor::MinMotor => delta.wrapping_add(self.motor_output_low),
        }
    }

    /// Resolve a whole frame in field order
    ///
    /// In raw mode every predictor except `Increment` is treated as `Zero`.
    pub fn resolve_row(
        &self,
        schema: &FrameSchema,
        deltas: Vec<i64>,
        inputs: &PredictionInputs,
        raw: bool,
    ) -> Vec<i64> {
        let mut row = deltas;
        for (i, field) in schema.fields.iter().enumerate() {
            let predictor = match field.predictor {
                Predictor::Increment => Predictor::Increment,
                _ if raw => Predictor::Zero,
                predictor => predictor,
            };
            let value = self.resolve(predictor, i, row[i], &row, inputs);
            row[i] = if reads_single_value(schema, field) {
                wrap_to_field_width(value, field)
            } else {
                value
            };
        }
        row
    }
}

/// Joint groups, increments and null fields are left unwrapped
fn reads_single_value(schema: &FrameSchema, field: &FieldSpec) -> bool {
    matches!(
        schema.groups.get(field.group),
        Some(FieldGroup::Single { encoding, .. }) if *encoding != Encoding::Null
    )
}

/// Wrap a resolved value to the 32-bit range the firmware computed it in
pub fn wrap_to_field_width(value: i64, field: &FieldSpec) -> i64 {
    if field.width == 8 {
        value
    } else if field.signed {
        value as i32 as i64
    } else {
        value as u32 as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Encoding, FrameType, SystemConfig};

    fn field(name: &str, signed: bool, predictor: Predictor) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            signed,
            predictor,
            encoding: Encoding::SignedVB,
            width: 4,
            group: 0,
        }
    }

    fn engine() -> PredictorEngine {
        let mut config = SystemConfig::new();
        config.insert("minthrottle", "1070");
        config.insert("vbatref", "4000");
        let intra = FrameSchema::new(
            FrameType::Intra,
            vec![
                field("motor[0]", false, Predictor::MinThrottle),
                field("motor[1]", false, Predictor::Motor0),
            ],
        );
        let gps_home = FrameSchema::new(
            FrameType::GpsHome,
            vec![
                field("GPS_home[0]", true, Predictor::Zero),
                field("GPS_home[1]", true, Predictor::Zero),
            ],
        );
        PredictorEngine::from_header(&LogHeader {
            config,
            intra,
            inter: None,
            gps: None,
            gps_home: Some(gps_home),
            slow: None,
            data_version: 2,
        })
    }

    #[test]
    fn test_straight_line_extrapolates() {
        let previous = [20i64];
        let previous2 = [10i64];
        let inputs = PredictionInputs {
            previous: Some(&previous),
            previous2: Some(&previous2),
            ..Default::default()
        };
        let engine = engine();
        assert_eq!(
            engine.resolve(Predictor::StraightLine, 0, 0, &[0], &inputs),
            30
        );
        assert_eq!(engine.resolve(Predictor::Average2, 0, 1, &[0], &inputs), 16);
        assert_eq!(engine.resolve(Predictor::Previous, 0, -4, &[0], &inputs), 16);
    }

    #[test]
    fn test_average_floors_negative_sums() {
        let previous = [-3i64];
        let previous2 = [0i64];
        let inputs = PredictionInputs {
            previous: Some(&previous),
            previous2: Some(&previous2),
            ..Default::default()
        };
        assert_eq!(engine().resolve(Predictor::Average2, 0, 0, &[0], &inputs), -2);
    }

    #[test]
    fn test_missing_history_falls_back_to_previous() {
        let previous = [7i64];
        let only_previous = PredictionInputs {
            previous: Some(&previous),
            ..Default::default()
        };
        let engine = engine();
        assert_eq!(
            engine.resolve(Predictor::StraightLine, 0, 1, &[0], &only_previous),
            8
        );
        assert_eq!(
            engine.resolve(Predictor::Average2, 0, 1, &[0], &only_previous),
            8
        );
        let empty = PredictionInputs::default();
        assert_eq!(engine.resolve(Predictor::StraightLine, 0, 5, &[0], &empty), 5);
    }

    #[test]
    fn test_constant_predictors() {
        let engine = engine();
        let inputs = PredictionInputs {
            last_main_time: Some(123_456),
            ..Default::default()
        };
        assert_eq!(engine.resolve(Predictor::MinThrottle, 0, 30, &[0], &inputs), 1100);
        assert_eq!(engine.resolve(Predictor::VbatRef, 0, -5, &[0], &inputs), 3995);
        assert_eq!(engine.resolve(Predictor::FifteenHundred, 0, 2, &[0], &inputs), 1502);
        // no motorOutput header: falls back to minthrottle
        assert_eq!(engine.resolve(Predictor::MinMotor, 0, 0, &[0], &inputs), 1070);
        assert_eq!(
            engine.resolve(Predictor::LastMainFrameTime, 0, 44, &[0], &inputs),
            123_500
        );
    }

    #[test]
    fn test_increment_ignores_delta() {
        let previous = [41i64];
        let inputs = PredictionInputs {
            previous: Some(&previous),
            skipped_frames: 3,
            ..Default::default()
        };
        assert_eq!(engine().resolve(Predictor::Increment, 0, 99, &[0], &inputs), 45);
    }

    #[test]
    fn test_home_coord_uses_axis() {
        let home = [-338_000_000i64, 1_510_000_000];
        let inputs = PredictionInputs {
            gps_home: Some(&home),
            ..Default::default()
        };
        let engine = engine();
        assert_eq!(
            engine.resolve(Predictor::HomeCoord(0), 0, 10, &[0], &inputs),
            -337_999_990
        );
        assert_eq!(
            engine.resolve(Predictor::HomeCoord(1), 0, -10, &[0], &inputs),
            1_509_999_990
        );
        assert_eq!(
            engine.resolve(Predictor::HomeCoord(1), 0, 7, &[0], &PredictionInputs::default()),
            7
        );
    }

    #[test]
    fn test_row_resolves_in_field_order() {
        let engine = engine();
        let schema = FrameSchema::new(
            FrameType::Intra,
            vec![
                field("motor[0]", false, Predictor::MinThrottle),
                field("motor[1]", false, Predictor::Motor0),
            ],
        );
        let row = engine.resolve_row(&schema, vec![30, -2], &PredictionInputs::default(), false);
        assert_eq!(row, vec![1100, 1098]);

        let raw = engine.resolve_row(&schema, vec![30, -2], &PredictionInputs::default(), true);
        assert_eq!(raw, vec![30, u32::MAX as i64 - 1]);
    }

    #[test]
    fn test_only_single_value_fields_wrap() {
        let engine = engine();
        let mut joint = field("rcCommand[0]", false, Predictor::Zero);
        joint.encoding = Encoding::Tag8_8SVB;
        let mut null = field("flags", false, Predictor::Previous);
        null.encoding = Encoding::Null;
        let mut single = field("motor[0]", false, Predictor::Zero);
        single.encoding = Encoding::UnsignedVB;
        let schema = FrameSchema::new(FrameType::Inter, vec![joint, null, single]);

        let previous = [0i64, -7, 0];
        let inputs = PredictionInputs {
            previous: Some(&previous),
            ..Default::default()
        };
        let row = engine.resolve_row(&schema, vec![-2, 0, -2], &inputs, false);
        assert_eq!(row, vec![-2, -7, u32::MAX as i64 - 1]);
    }

    #[test]
    fn test_values_wrap_to_32_bits() {
        let mut spec = field("x", true, Predictor::Zero);
        assert_eq!(wrap_to_field_width(i32::MAX as i64 + 1, &spec), i32::MIN as i64);
        spec.signed = false;
        assert_eq!(wrap_to_field_width(-1, &spec), u32::MAX as i64);
        spec.width = 8;
        assert_eq!(wrap_to_field_width(-1, &spec), -1);
    }
}
