// stride_core/src/estimation/state.rs

use std::fmt;

use nalgebra::{DMatrix, Matrix3, Vector3, Vector6};

/// Number of columns of `X` that are not contact points (rotation, velocity, position).
pub(crate) const BASE_DIM_X: usize = 5;
/// Dimension of the bias parameter vector `[b_g; b_a]`.
pub(crate) const DIM_THETA: usize = 6;

/// The state of a contact-aided inertial navigation filter.
///
/// `X` is an element of SE_{2+K}(3):
///
/// ```text
///     | R  v  p  d_1 .. d_K |
/// X = | 0  1  0   0  ..  0  |
///     | ...             ... |
///     | 0  0  0   0  ..  1  |
/// ```
///
/// where `R` is the body orientation, `v` and `p` the body velocity and
/// position in the world frame, and `d_i` the world position of the i-th
/// tracked contact point. `theta` holds the gyroscope bias followed by the
/// accelerometer bias. `P` is the covariance of the right-invariant error,
/// ordered `[rotation, velocity, position, d_1..d_K, theta]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    x: DMatrix<f64>,
    theta: Vector6<f64>,
    p: DMatrix<f64>,
}

impl Default for RobotState {
    fn default() -> Self {
        let dim_p = 3 * (BASE_DIM_X - 2) + DIM_THETA;
        Self {
            x: DMatrix::identity(BASE_DIM_X, BASE_DIM_X),
            theta: Vector6::zeros(),
            p: DMatrix::identity(dim_p, dim_p),
        }
    }
}

impl RobotState {
    /// Creates a state with no tracked contacts and the default unit covariance.
    pub fn new(
        rotation: Matrix3<f64>,
        velocity: Vector3<f64>,
        position: Vector3<f64>,
        gyroscope_bias: Vector3<f64>,
        accelerometer_bias: Vector3<f64>,
    ) -> Self {
        let mut state = Self::default();
        state.set_rotation(&rotation);
        state.set_velocity(&velocity);
        state.set_position(&position);
        state.set_gyroscope_bias(&gyroscope_bias);
        state.set_accelerometer_bias(&accelerometer_bias);
        state
    }

    // --- Dimensions ---

    pub fn dim_x(&self) -> usize {
        self.x.ncols()
    }

    pub fn dim_theta(&self) -> usize {
        DIM_THETA
    }

    pub fn dim_p(&self) -> usize {
        self.p.ncols()
    }

    /// Number of contact points currently carried in `X`.
    pub fn contact_count(&self) -> usize {
        self.dim_x() - BASE_DIM_X
    }

    // --- Full Blocks ---

    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    pub fn theta(&self) -> &Vector6<f64> {
        &self.theta
    }

    pub fn p(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Replaces `X`. The caller keeps `P` consistent with the new dimension.
    pub fn set_x(&mut self, x: DMatrix<f64>) {
        self.x = x;
    }

    pub fn set_theta(&mut self, theta: Vector6<f64>) {
        self.theta = theta;
    }

    pub fn set_p(&mut self, p: DMatrix<f64>) {
        self.p = p;
    }

    // --- Named Sub-Blocks ---

    pub fn rotation(&self) -> Matrix3<f64> {
        self.x.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.x.fixed_view::<3, 1>(0, 3).into_owned()
    }

    pub fn position(&self) -> Vector3<f64> {
        self.x.fixed_view::<3, 1>(0, 4).into_owned()
    }

    pub fn gyroscope_bias(&self) -> Vector3<f64> {
        self.theta.fixed_rows::<3>(0).into_owned()
    }

    pub fn accelerometer_bias(&self) -> Vector3<f64> {
        self.theta.fixed_rows::<3>(3).into_owned()
    }

    /// World position of the contact stored in column `column` of `X`.
    pub fn contact_position(&self, column: usize) -> Option<Vector3<f64>> {
        (column >= BASE_DIM_X && column < self.dim_x())
            .then(|| self.x.fixed_view::<3, 1>(0, column).into_owned())
    }

    pub fn set_rotation(&mut self, rotation: &Matrix3<f64>) {
        self.x.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    }

    pub fn set_velocity(&mut self, velocity: &Vector3<f64>) {
        self.x.fixed_view_mut::<3, 1>(0, 3).copy_from(velocity);
    }

    pub fn set_position(&mut self, position: &Vector3<f64>) {
        self.x.fixed_view_mut::<3, 1>(0, 4).copy_from(position);
    }

    pub fn set_gyroscope_bias(&mut self, bias: &Vector3<f64>) {
        self.theta.fixed_rows_mut::<3>(0).copy_from(bias);
    }

    pub fn set_accelerometer_bias(&mut self, bias: &Vector3<f64>) {
        self.theta.fixed_rows_mut::<3>(3).copy_from(bias);
    }
}

impl fmt::Display for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------- Robot State -------------")?;
        writeln!(f, "X:{}", self.x)?;
        writeln!(f, "Theta:{}", self.theta)?;
        write!(f, "P:{}", self.p)
    }
}
