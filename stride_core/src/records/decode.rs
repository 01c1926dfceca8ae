// stride_core/src/records/decode.rs

use nalgebra::{Matrix3, Matrix4, Matrix6, Quaternion, UnitQuaternion, Vector3};

use super::{validate, PAYLOAD_OFFSET};
use crate::error::RecordError;
use crate::messages::RecordKind;
use crate::types::{ContactId, ContactSet, ImuSample, KinematicBatch, KinematicMeasurement};

/// Payload fields of an IMU record: `wx wy wz ax ay az`.
pub const IMU_FIELDS: usize = 6;

/// Fields per kinematic block: id(1) + quaternion(4) + position(3) + covariance(36).
pub const KINEMATIC_BLOCK_FIELDS: usize = 1 + 4 + 3 + 36;

// --- Field Parsers ---

pub(crate) fn parse_float(tokens: &[&str], position: usize) -> Result<f64, RecordError> {
    let token = tokens.get(position).copied().unwrap_or_default();
    token.parse().map_err(|_| RecordError::InvalidFloat {
        position,
        token: token.to_string(),
    })
}

fn parse_id(tokens: &[&str], position: usize) -> Result<ContactId, RecordError> {
    let token = tokens.get(position).copied().unwrap_or_default();
    token.parse().map_err(|_| RecordError::InvalidInteger {
        position,
        token: token.to_string(),
    })
}

/// Parses `N` consecutive floats starting at `position`.
fn parse_floats<const N: usize>(tokens: &[&str], position: usize) -> Result<[f64; N], RecordError> {
    let mut values = [0.0; N];
    for (i, value) in values.iter_mut().enumerate() {
        *value = parse_float(tokens, position + i)?;
    }
    Ok(values)
}

// --- Typed Decoders ---
// Every decoder takes the whole record (tag and timestamp included) so that
// error positions refer to the original line.

/// Decodes the six inertial scalars of an `IMU` record, in log order.
pub fn decode_imu(tokens: &[&str]) -> Result<ImuSample, RecordError> {
    validate(RecordKind::Imu, tokens)?;
    let values: [f64; IMU_FIELDS] = parse_floats(tokens, PAYLOAD_OFFSET)?;
    Ok(ImuSample::from(values))
}

/// Decodes the `(id, indicator)` pairs of a `CONTACT` record.
///
/// The indicator is parsed as a float and is `true` for any nonzero value,
/// negative values included. Order and duplicates are preserved.
pub fn decode_contacts(tokens: &[&str]) -> Result<ContactSet, RecordError> {
    validate(RecordKind::Contact, tokens)?;
    (PAYLOAD_OFFSET..tokens.len())
        .step_by(2)
        .map(|i| {
            let id = parse_id(tokens, i)?;
            let indicator = parse_float(tokens, i + 1)?;
            Ok((id, indicator != 0.0))
        })
        .collect()
}

/// Decodes every 44-field block of a `KINEMATIC` record into one measurement.
pub fn decode_kinematics(tokens: &[&str]) -> Result<KinematicBatch, RecordError> {
    validate(RecordKind::Kinematic, tokens)?;
    tokens[PAYLOAD_OFFSET..]
        .chunks_exact(KINEMATIC_BLOCK_FIELDS)
        .enumerate()
        .map(|(block, fields)| {
            decode_kinematic_block(fields, PAYLOAD_OFFSET + block * KINEMATIC_BLOCK_FIELDS)
        })
        .collect()
}

/// Decodes a single block. `offset` is the position of the block's first field
/// in the full record and is only used for error reporting.
fn decode_kinematic_block(
    fields: &[&str],
    offset: usize,
) -> Result<KinematicMeasurement, RecordError> {
    let id = parse_id(fields, 0).map_err(|e| shift_position(e, offset))?;
    let values: [f64; KINEMATIC_BLOCK_FIELDS - 1] =
        parse_floats(fields, 1).map_err(|e| shift_position(e, offset))?;

    // The log stores the quaternion as (w, x, y, z). It is normalized before use;
    // a zero quaternion cannot be and stands for the identity rotation.
    let q = Quaternion::new(values[0], values[1], values[2], values[3]);
    let rotation = UnitQuaternion::try_new(q, 0.0)
        .map(|unit| unit.to_rotation_matrix().into_inner())
        .unwrap_or_else(Matrix3::identity);
    let translation = Vector3::new(values[4], values[5], values[6]);

    let mut pose = Matrix4::identity();
    pose.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    pose.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);

    // Row j, column k lives at offset j * 6 + k.
    let covariance = Matrix6::from_row_slice(&values[7..]);

    Ok(KinematicMeasurement {
        id,
        pose,
        covariance,
    })
}

fn shift_position(error: RecordError, offset: usize) -> RecordError {
    match error {
        RecordError::InvalidFloat { position, token } => RecordError::InvalidFloat {
            position: position + offset,
            token,
        },
        RecordError::InvalidInteger { position, token } => RecordError::InvalidInteger {
            position: position + offset,
            token,
        },
        other => other,
    }
}
