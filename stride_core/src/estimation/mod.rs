// stride_core/src/estimation/mod.rs

use crate::types::{ContactSet, ImuSample, KinematicBatch};

mod lie;
mod noise;
mod state;

pub mod filters;

pub use lie::{adjoint_sek3, exp_sek3, exp_so3, skew};
pub use noise::NoiseParams;
pub use state::RobotState;

/// The contract for any algorithm that performs the "State Estimator" role
/// during a log replay.
///
/// The replay loop owns the estimator exclusively and calls it strictly
/// sequentially, so implementations need no interior synchronisation.
/// Every call is assumed to succeed.
pub trait Estimator {
    /// Advances the state estimate by `dt` seconds using one inertial sample.
    fn propagate(&mut self, imu: &ImuSample, dt: f64);

    /// Updates the per-id contact indicators. Later entries win over earlier ones.
    fn set_contacts(&mut self, contacts: &ContactSet);

    /// Fuses a batch of relative-pose measurements, one per end-effector.
    fn correct_kinematics(&mut self, measurements: &KinematicBatch);

    /// Returns a reference to the current best estimate of the state.
    fn state(&self) -> &RobotState;

    /// Returns the noise model the estimator was configured with.
    fn noise_params(&self) -> &NoiseParams;
}
