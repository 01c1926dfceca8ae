// stride_core/src/estimation/filters/inekf.rs

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector6};
use tracing::{debug, warn};

use crate::estimation::state::DIM_THETA;
use crate::estimation::{adjoint_sek3, exp_sek3, exp_so3, skew, Estimator, NoiseParams, RobotState};
use crate::types::{ContactId, ContactSet, ImuSample, KinematicBatch, KinematicMeasurement};

/// Magnitude of standard gravity in m/s^2.
pub const GRAVITY_MAGNITUDE: f64 = 9.81;

/// Offset of the covariance block belonging to column `column` of `X`.
fn error_index(column: usize) -> usize {
    3 * column - 6
}

/// A stacked right-invariant observation `Y = X^-1 b + V`.
struct Observation {
    y: DVector<f64>,
    b: DVector<f64>,
    h: DMatrix<f64>,
    n: DMatrix<f64>,
    /// Selects the first three rows of every `X * y_i - b_i` segment.
    pi: DMatrix<f64>,
}

/// A right-invariant extended Kalman filter for contact-aided inertial navigation.
///
/// The filter propagates with raw IMU samples and treats every foot that is
/// in contact as a static landmark. Kinematic measurements of a foot that is
/// in contact either correct an existing landmark or, the first time the
/// foot touches down, augment the state with a new one. A foot that lifts
/// off is marginalized out of the state.
#[derive(Debug, Clone)]
pub struct InvariantEkf {
    state: RobotState,
    noise_params: NoiseParams,
    gravity: Vector3<f64>,
    /// Latest contact indicator per id.
    contacts: BTreeMap<ContactId, bool>,
    /// Contact id -> column of `X` holding that contact's world position.
    estimated_contact_positions: BTreeMap<ContactId, usize>,
}

impl InvariantEkf {
    /// Creates a new filter instance with standard gravity along -z.
    pub fn new(state: RobotState, noise_params: NoiseParams) -> Self {
        Self {
            state,
            noise_params,
            gravity: Vector3::new(0.0, 0.0, -GRAVITY_MAGNITUDE),
            contacts: BTreeMap::new(),
            estimated_contact_positions: BTreeMap::new(),
        }
    }

    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn gravity(&self) -> &Vector3<f64> {
        &self.gravity
    }

    pub fn contacts(&self) -> &BTreeMap<ContactId, bool> {
        &self.contacts
    }

    pub fn estimated_contact_positions(&self) -> &BTreeMap<ContactId, usize> {
        &self.estimated_contact_positions
    }

    /// World position of a tracked contact, if the filter currently estimates it.
    pub fn contact_position(&self, id: ContactId) -> Option<Vector3<f64>> {
        let column = *self.estimated_contact_positions.get(&id)?;
        self.state.contact_position(column)
    }

    // --- Private Helper Methods for the InEKF Algorithm ---

    /// The internal "update" step for a stacked right-invariant observation.
    fn correct(&mut self, obs: &Observation) {
        let p = self.state.p().clone();
        let pht = &p * obs.h.transpose();
        let s = &obs.h * &pht + &obs.n;

        let Some(s_inv) = s.try_inverse() else {
            // A singular innovation covariance means the measurement is degenerate.
            warn!("Innovation covariance is singular, skipping kinematic correction");
            return;
        };
        let k = pht * s_inv;

        // Z = BigX * Y - b, where BigX repeats X along the diagonal.
        let x = self.state.x().clone();
        let dim_x = x.ncols();
        let mut z = DVector::zeros(obs.y.len());
        for start in (0..obs.y.len()).step_by(dim_x) {
            let segment = &x * obs.y.rows(start, dim_x) - obs.b.rows(start, dim_x);
            z.rows_mut(start, dim_x).copy_from(&segment);
        }

        let delta = &k * &obs.pi * z;
        let dim_p = self.state.dim_p();
        let dx = exp_sek3(&delta.rows(0, dim_p - DIM_THETA).into_owned());
        let dtheta: Vector6<f64> = delta.fixed_rows::<6>(dim_p - DIM_THETA).into_owned();

        // Right-invariant update of the mean.
        self.state.set_x(dx * x);
        self.state.set_theta(self.state.theta() + dtheta);

        // Joseph form keeps P symmetric positive definite.
        let ikh = DMatrix::identity(dim_p, dim_p) - &k * &obs.h;
        let p_new = &ikh * p * ikh.transpose() + &k * &obs.n * k.transpose();
        self.state.set_p(p_new);
    }

    /// Stacks one observation per measurement of a contact that is both
    /// indicated and already tracked.
    fn build_observation(&self, tracked: &[(&KinematicMeasurement, usize)]) -> Observation {
        let dim_x = self.state.dim_x();
        let dim_p = self.state.dim_p();
        let m = tracked.len();
        let rotation = self.state.rotation();

        let mut obs = Observation {
            y: DVector::zeros(m * dim_x),
            b: DVector::zeros(m * dim_x),
            h: DMatrix::zeros(3 * m, dim_p),
            n: DMatrix::zeros(3 * m, 3 * m),
            pi: DMatrix::zeros(3 * m, m * dim_x),
        };

        for (i, (measurement, column)) in tracked.iter().enumerate() {
            let row = 3 * i;
            let start = i * dim_x;

            obs.h.fixed_view_mut::<3, 3>(row, 6).copy_from(&(-Matrix3::<f64>::identity()));
            let landmark = error_index(*column);
            obs.h.fixed_view_mut::<3, 3>(row, landmark).fill_with_identity();

            let noise = rotation * measurement.position_covariance() * rotation.transpose();
            obs.n.fixed_view_mut::<3, 3>(row, row).copy_from(&noise);

            obs.pi.fixed_view_mut::<3, 3>(row, start).fill_with_identity();

            obs.y.fixed_rows_mut::<3>(start).copy_from(&measurement.translation());
            obs.y[start + 4] = 1.0;
            obs.y[start + column] = -1.0;

            obs.b[start + 4] = 1.0;
            obs.b[start + column] = -1.0;
        }
        obs
    }

    /// Marginalizes the given contacts out of `X` and `P`.
    fn remove_contacts(&mut self, mut removals: Vec<(ContactId, usize)>) {
        let mut x = self.state.x().clone();
        let mut p = self.state.p().clone();

        for i in 0..removals.len() {
            let (id, column) = removals[i];
            debug!(id, "Contact lost, removing it from the state");
            self.estimated_contact_positions.remove(&id);

            x = x.remove_row(column).remove_column(column);
            let start = error_index(column);
            p = p.remove_rows(start, 3).remove_columns(start, 3);

            // Every column to the right of the removed one shifts left by one.
            for tracked in self.estimated_contact_positions.values_mut() {
                if *tracked > column {
                    *tracked -= 1;
                }
            }
            for pending in removals.iter_mut().skip(i + 1) {
                if pending.1 > column {
                    pending.1 -= 1;
                }
            }
        }

        self.state.set_x(x);
        self.state.set_p(p);
    }

    /// Adds a new contact landmark for every measurement of a newly indicated contact.
    fn augment_contacts(&mut self, new_contacts: &[&KinematicMeasurement]) {
        for measurement in new_contacts {
            debug!(id = measurement.id, "New contact, augmenting the state");
            let rotation = self.state.rotation();
            let position = self.state.position();

            // --- Mean: the foot position in the world frame ---
            let column = self.state.dim_x();
            let mut x = self.state.x().clone().resize(column + 1, column + 1, 0.0);
            x[(column, column)] = 1.0;
            let foot = position + rotation * measurement.translation();
            x.fixed_view_mut::<3, 1>(0, column).copy_from(&foot);

            // --- Covariance: the new landmark inherits the body position error ---
            let dim_p = self.state.dim_p();
            let dim_nav = dim_p - DIM_THETA;
            let mut f = DMatrix::<f64>::zeros(dim_p + 3, dim_p);
            f.view_mut((0, 0), (dim_nav, dim_nav)).fill_with_identity();
            f.fixed_view_mut::<3, 3>(dim_nav, 6).fill_with_identity();
            f.fixed_view_mut::<6, 6>(dim_nav + 3, dim_nav).fill_with_identity();

            let mut g = DMatrix::<f64>::zeros(dim_p + 3, 3);
            g.fixed_view_mut::<3, 3>(dim_nav, 0).copy_from(&rotation);

            let p = self.state.p();
            let p_aug = &f * p * f.transpose()
                + &g * measurement.position_covariance() * g.transpose();

            self.state.set_x(x);
            self.state.set_p(p_aug);
            self.estimated_contact_positions
                .insert(measurement.id, column);
        }
    }
}

// --- The Public Trait Implementation ---
impl Estimator for InvariantEkf {
    fn propagate(&mut self, imu: &ImuSample, dt: f64) {
        // --- 1. Bias-corrected inputs ---
        let w: Vector3<f64> = imu.fixed_rows::<3>(0) - self.state.gyroscope_bias();
        let a: Vector3<f64> = imu.fixed_rows::<3>(3) - self.state.accelerometer_bias();

        let x = self.state.x().clone();
        let p = self.state.p().clone();
        let rotation = self.state.rotation();
        let velocity = self.state.velocity();
        let position = self.state.position();

        let dim_x = self.state.dim_x();
        let dim_p = self.state.dim_p();
        let bias_start = dim_p - DIM_THETA;
        let g = self.gravity;

        // --- 2. Linearized invariant error dynamics ---
        let mut a_mat = DMatrix::<f64>::zeros(dim_p, dim_p);
        a_mat.fixed_view_mut::<3, 3>(3, 0).copy_from(&skew(&g));
        a_mat.fixed_view_mut::<3, 3>(6, 3).fill_with_identity();
        a_mat.fixed_view_mut::<3, 3>(0, bias_start).copy_from(&(-rotation));
        a_mat.fixed_view_mut::<3, 3>(3, bias_start + 3).copy_from(&(-rotation));
        for column in 3..dim_x {
            let col: Vector3<f64> = x.fixed_view::<3, 1>(0, column).into_owned();
            let row = error_index(column);
            a_mat.fixed_view_mut::<3, 3>(row, bias_start).copy_from(&(-skew(&col) * rotation));
        }

        // --- 3. Process noise (contact landmarks drift with the contact noise) ---
        let noise = &self.noise_params;
        let (bg, ba) = (bias_start, bias_start + 3);
        let mut q = DMatrix::<f64>::zeros(dim_p, dim_p);
        q.fixed_view_mut::<3, 3>(0, 0).copy_from(noise.gyroscope_cov());
        q.fixed_view_mut::<3, 3>(3, 3).copy_from(noise.accelerometer_cov());
        for &column in self.estimated_contact_positions.values() {
            let i = error_index(column);
            q.fixed_view_mut::<3, 3>(i, i).copy_from(noise.contact_cov());
        }
        q.fixed_view_mut::<3, 3>(bg, bg).copy_from(noise.gyroscope_bias_cov());
        q.fixed_view_mut::<3, 3>(ba, ba).copy_from(noise.accelerometer_bias_cov());

        // --- 4. Discretization: Phi ~ exp(A dt) to first order ---
        let identity = DMatrix::<f64>::identity(dim_p, dim_p);
        let phi = &identity + &a_mat * dt;
        let mut adj = identity;
        adj.view_mut((0, 0), (bias_start, bias_start)).copy_from(&adjoint_sek3(&x));
        let phi_adj = &phi * adj;
        let q_hat = &phi_adj * q * phi_adj.transpose() * dt;

        let p_pred = &phi * p * phi.transpose() + q_hat;

        // --- 5. Propagate the mean. Contact positions are static. ---
        let accel_world = rotation * a + g;
        let rotation_pred = rotation * exp_so3(&(w * dt));
        let velocity_pred = velocity + accel_world * dt;
        let position_pred = position + velocity * dt + 0.5 * accel_world * dt * dt;

        self.state.set_rotation(&rotation_pred);
        self.state.set_velocity(&velocity_pred);
        self.state.set_position(&position_pred);
        self.state.set_p(p_pred);
    }

    fn set_contacts(&mut self, contacts: &ContactSet) {
        for &(id, indicator) in contacts {
            self.contacts.insert(id, indicator);
        }
    }

    fn correct_kinematics(&mut self, measurements: &KinematicBatch) {
        let mut tracked: Vec<(&KinematicMeasurement, usize)> = Vec::new();
        let mut removals: Vec<(ContactId, usize)> = Vec::new();
        let mut new_contacts: Vec<&KinematicMeasurement> = Vec::new();
        let mut used_ids: Vec<ContactId> = Vec::new();

        for measurement in measurements {
            let id = measurement.id;
            if used_ids.contains(&id) {
                warn!(id, "Duplicate id in kinematic batch, skipping");
                continue;
            }
            used_ids.push(id);

            // Without a contact indicator we cannot tell what the measurement means.
            let Some(&in_contact) = self.contacts.get(&id) else {
                continue;
            };
            let column = self.estimated_contact_positions.get(&id).copied();

            match (in_contact, column) {
                (true, Some(column)) => tracked.push((measurement, column)),
                (true, None) => new_contacts.push(measurement),
                (false, Some(column)) => removals.push((id, column)),
                (false, None) => {}
            }
        }

        if !tracked.is_empty() {
            let obs = self.build_observation(&tracked);
            self.correct(&obs);
        }
        if !removals.is_empty() {
            self.remove_contacts(removals);
        }
        if !new_contacts.is_empty() {
            self.augment_contacts(&new_contacts);
        }
    }

    fn state(&self) -> &RobotState {
        &self.state
    }

    fn noise_params(&self) -> &NoiseParams {
        &self.noise_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix4, Matrix6};

    const EPSILON: f64 = 1e-9;

    fn foot(id: ContactId, translation: Vector3<f64>) -> KinematicMeasurement {
        let mut pose = Matrix4::identity();
        pose.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        KinematicMeasurement {
            id,
            pose,
            covariance: Matrix6::identity() * 1e-4,
        }
    }

    fn level_filter() -> InvariantEkf {
        InvariantEkf::new(RobotState::default(), NoiseParams::default())
    }

    #[test]
    fn stationary_imu_keeps_the_robot_still() {
        let mut filter = level_filter();
        let at_rest = ImuSample::new(0.0, 0.0, 0.0, 0.0, 0.0, 9.81);
        for _ in 0..100 {
            filter.propagate(&at_rest, 0.01);
        }
        let state = filter.state();
        assert_abs_diff_eq!(state.velocity(), Vector3::zeros(), epsilon = EPSILON);
        assert_abs_diff_eq!(state.position(), Vector3::zeros(), epsilon = EPSILON);
        assert_abs_diff_eq!(state.rotation(), Matrix3::identity(), epsilon = EPSILON);
    }

    #[test]
    fn free_fall_integrates_gravity() {
        let mut filter = level_filter();
        filter.propagate(&ImuSample::zeros(), 0.5);
        let state = filter.state();
        let expected_velocity = Vector3::new(0.0, 0.0, -4.905);
        assert_abs_diff_eq!(state.velocity(), expected_velocity, epsilon = EPSILON);
        assert_abs_diff_eq!(
            state.position(),
            Vector3::new(0.0, 0.0, -0.5 * 9.81 * 0.25),
            epsilon = EPSILON
        );
    }

    #[test]
    fn propagation_grows_uncertainty() {
        let mut filter = level_filter();
        let before = filter.state().p().trace();
        filter.propagate(&ImuSample::new(0.1, 0.0, 0.0, 0.0, 0.0, 9.81), 0.1);
        let p = filter.state().p();
        assert!(p.trace() > before);
        assert_abs_diff_eq!(p.clone(), p.transpose(), epsilon = 1e-9);
    }

    #[test]
    fn later_contact_indicators_win() {
        let mut filter = level_filter();
        filter.set_contacts(&vec![(0, true), (1, false), (0, false)]);
        filter.set_contacts(&vec![(1, true)]);
        assert_eq!(filter.contacts().get(&0), Some(&false));
        assert_eq!(filter.contacts().get(&1), Some(&true));
    }

    #[test]
    fn measurements_without_contact_state_are_ignored() {
        let mut filter = level_filter();
        let before = filter.state().clone();
        filter.correct_kinematics(&vec![foot(0, Vector3::new(0.0, 0.0, -0.5))]);
        assert_eq!(filter.state(), &before);
    }

    #[test]
    fn touchdown_augments_the_state() {
        let mut filter = level_filter();
        filter.set_contacts(&vec![(0, true), (1, true)]);
        filter.correct_kinematics(&vec![
            foot(0, Vector3::new(0.2, 0.1, -0.5)),
            foot(1, Vector3::new(-0.2, 0.1, -0.5)),
        ]);

        let state = filter.state();
        assert_eq!(state.dim_x(), 7);
        assert_eq!(state.dim_p(), 21);
        assert_eq!(filter.estimated_contact_positions().get(&0), Some(&5));
        assert_eq!(filter.estimated_contact_positions().get(&1), Some(&6));
        assert_abs_diff_eq!(
            filter.contact_position(1).unwrap(),
            Vector3::new(-0.2, 0.1, -0.5),
            epsilon = EPSILON
        );
    }

    #[test]
    fn consistent_measurement_leaves_mean_unchanged() {
        let mut filter = level_filter();
        filter.set_contacts(&vec![(0, true)]);
        let batch = vec![foot(0, Vector3::new(0.0, 0.0, -0.5))];
        filter.correct_kinematics(&batch);
        let before = filter.state().x().clone();

        // Same foot, same relative position: zero innovation.
        filter.correct_kinematics(&batch);
        assert_abs_diff_eq!(filter.state().x().clone(), before, epsilon = EPSILON);
        assert_eq!(filter.state().dim_x(), 6);
    }

    #[test]
    fn correction_splits_the_innovation_between_prior_and_measurement() {
        let mut filter = level_filter();
        filter.set_contacts(&vec![(0, true)]);
        filter.correct_kinematics(&vec![foot(0, Vector3::new(0.0, 0.0, -0.5))]);

        // The foot now appears 10 cm further forward. Body and landmark position
        // errors are fully correlated right after touchdown, so only the landmark
        // moves, and with equal prior and measurement noise it moves halfway.
        filter.correct_kinematics(&vec![foot(0, Vector3::new(0.1, 0.0, -0.5))]);
        let position = filter.state().position();
        assert_abs_diff_eq!(position, Vector3::zeros(), epsilon = EPSILON);
        assert_abs_diff_eq!(
            filter.contact_position(0).unwrap(),
            Vector3::new(0.05, 0.0, -0.5),
            epsilon = EPSILON
        );
    }

    #[test]
    fn liftoff_removes_the_contact_and_reindexes() {
        let mut filter = level_filter();
        filter.set_contacts(&vec![(0, true), (1, true), (2, true)]);
        filter.correct_kinematics(&vec![
            foot(0, Vector3::new(0.2, 0.1, -0.5)),
            foot(1, Vector3::new(-0.2, 0.1, -0.5)),
            foot(2, Vector3::new(0.0, -0.1, -0.5)),
        ]);
        assert_eq!(filter.state().dim_x(), 8);

        filter.set_contacts(&vec![(0, false), (1, false)]);
        filter.correct_kinematics(&vec![
            foot(0, Vector3::new(0.2, 0.1, -0.5)),
            foot(1, Vector3::new(-0.2, 0.1, -0.5)),
            foot(2, Vector3::new(0.0, -0.1, -0.5)),
        ]);

        assert_eq!(filter.state().dim_x(), 6);
        assert_eq!(filter.state().dim_p(), 18);
        assert_eq!(filter.estimated_contact_positions().len(), 1);
        assert_eq!(filter.estimated_contact_positions().get(&2), Some(&5));
        assert_abs_diff_eq!(
            filter.contact_position(2).unwrap(),
            Vector3::new(0.0, -0.1, -0.5),
            epsilon = 1e-6
        );
    }

    #[test]
    fn duplicate_ids_in_a_batch_use_the_first_measurement() {
        let mut filter = level_filter();
        filter.set_contacts(&vec![(4, true)]);
        filter.correct_kinematics(&vec![
            foot(4, Vector3::new(0.3, 0.0, -0.5)),
            foot(4, Vector3::new(9.0, 9.0, 9.0)),
        ]);
        assert_eq!(filter.state().dim_x(), 6);
        assert_abs_diff_eq!(
            filter.contact_position(4).unwrap(),
            Vector3::new(0.3, 0.0, -0.5),
            epsilon = EPSILON
        );
    }
}
