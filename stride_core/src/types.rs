// stride_core/src/types.rs

use nalgebra::{Matrix3, Matrix4, Matrix6, Vector3, Vector6};

// --- Core Type Aliases ---

/// One inertial sample: angular velocity (rad/s) followed by specific force
/// (m/s^2), both in the sensor frame: `[wx, wy, wz, ax, ay, az]`.
pub type ImuSample = Vector6<f64>;

/// Identifier of a tracked end-effector (foot, hand, ...).
pub type ContactId = i32;

/// Ordered `(id, in_contact)` pairs exactly as they appeared in one record.
pub type ContactSet = Vec<(ContactId, bool)>;

/// All kinematic measurements carried by a single record.
pub type KinematicBatch = Vec<KinematicMeasurement>;

/// A relative pose measurement of one end-effector, expressed in the body frame.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicMeasurement {
    pub id: ContactId,
    /// Homogeneous transform. The top-left 3x3 block is the rotation built from a
    /// unit quaternion, the top-right 3x1 block is the translation.
    pub pose: Matrix4<f64>,
    /// Measurement covariance, ordered `[rotation; translation]`.
    pub covariance: Matrix6<f64>,
}

impl KinematicMeasurement {
    pub fn rotation(&self) -> Matrix3<f64> {
        self.pose.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.pose.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// The translational block of the covariance (rows/cols 3..6).
    pub fn position_covariance(&self) -> Matrix3<f64> {
        self.covariance.fixed_view::<3, 3>(3, 3).into_owned()
    }
}
