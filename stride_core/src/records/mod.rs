// stride_core/src/records/mod.rs

//! Turns one line of a replay log into a typed [`LogEntry`].
//!
//! The pipeline is strictly forward: `tokenize` -> `RecordKind::from_tag` ->
//! `validate` -> one of the typed decoders. Nothing here touches the replay
//! cursor or the estimator, so decoding the same line twice always yields the
//! same value.

mod decode;

pub use decode::{
    decode_contacts, decode_imu, decode_kinematics, IMU_FIELDS, KINEMATIC_BLOCK_FIELDS,
};

use crate::error::{FieldCount, RecordError};
use crate::messages::{LogEntry, RecordKind};

/// Index of the first field after the tag and the timestamp.
pub const PAYLOAD_OFFSET: usize = 2;

/// Splits a line into its whitespace-delimited fields. Runs of whitespace are
/// treated as a single delimiter, so an empty line yields no fields.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// The payload arity rule for a recognized kind, or `None` for `Unrecognized`.
pub fn expected_fields(kind: RecordKind) -> Option<FieldCount> {
    match kind {
        RecordKind::Imu => Some(FieldCount::Exactly(IMU_FIELDS)),
        RecordKind::Contact => Some(FieldCount::MultipleOf(2)),
        RecordKind::Kinematic => Some(FieldCount::PositiveMultipleOf(KINEMATIC_BLOCK_FIELDS)),
        RecordKind::Unrecognized => None,
    }
}

/// Checks that a recognized record carries a timestamp and the right number of
/// payload fields. Unrecognized records always pass.
pub fn validate(kind: RecordKind, tokens: &[&str]) -> Result<(), RecordError> {
    let Some(expected) = expected_fields(kind) else {
        return Ok(());
    };
    if tokens.len() < PAYLOAD_OFFSET {
        return Err(RecordError::MissingTimestamp { kind });
    }

    let found = tokens.len() - PAYLOAD_OFFSET;
    if !expected.admits(found) {
        return Err(RecordError::FieldCount {
            kind,
            expected,
            found,
        });
    }
    Ok(())
}

/// Tokenizes, classifies, validates and decodes a single log line.
pub fn decode_line(line: &str) -> Result<LogEntry, RecordError> {
    let tokens = tokenize(line);
    let Some(&tag) = tokens.first() else {
        return Err(RecordError::Empty);
    };

    let kind = RecordKind::from_tag(tag);
    validate(kind, &tokens)?;

    let entry = match kind {
        RecordKind::Imu => LogEntry::Imu {
            timestamp: decode::parse_float(&tokens, 1)?,
            sample: decode_imu(&tokens)?,
        },
        RecordKind::Contact => LogEntry::Contact {
            timestamp: decode::parse_float(&tokens, 1)?,
            contacts: decode_contacts(&tokens)?,
        },
        RecordKind::Kinematic => LogEntry::Kinematic {
            timestamp: decode::parse_float(&tokens, 1)?,
            measurements: decode_kinematics(&tokens)?,
        },
        RecordKind::Unrecognized => LogEntry::Unrecognized {
            tag: tag.to_string(),
            timestamp: tokens.get(1).and_then(|t| t.parse().ok()),
        },
    };
    Ok(entry)
}
