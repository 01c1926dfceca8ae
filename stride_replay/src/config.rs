// stride_replay/src/config.rs

//! Loads and validates the replay configuration.
//!
//! Values are layered with `figment`: built-in defaults, then the TOML file,
//! then `STRIDE_`-prefixed environment variables (`__` separates nesting
//! levels, e.g. `STRIDE_REPLAY__DT_MAX=0.5`), then command-line overrides.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use stride_core::prelude::{DtWindow, InvariantEkf, NoiseParams, RobotState};
use stride_core::replay::{DEFAULT_DT_MAX, DEFAULT_DT_MIN};
use thiserror::Error;

use crate::serde_helpers;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] figment::Error),

    #[error("dt window is empty: dt_min ({min}) must be smaller than dt_max ({max})")]
    EmptyDtWindow { min: f64, max: f64 },
}

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// The root of the data parsed from a `replay.toml` file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ReplayConfig {
    #[serde(default)] // Use default if the [replay] section is missing
    pub replay: ReplaySection,

    #[serde(default)]
    pub initial_state: InitialState,

    #[serde(default)]
    pub noise: NoiseSection,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in replay.toml.
// =========================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplaySection {
    /// The measurement log to replay.
    pub log_file: PathBuf,
    /// Exclusive lower bound of the admissible propagation interval (s).
    pub dt_min: f64,
    /// Exclusive upper bound of the admissible propagation interval (s).
    pub dt_max: f64,
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self {
            log_file: "assets/data/imu_kinematic_measurements.txt".into(),
            dt_min: DEFAULT_DT_MIN,
            dt_max: DEFAULT_DT_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialState {
    /// Body orientation in the world frame, as three rows.
    #[serde(with = "serde_helpers::matrix3_from_rows")]
    pub rotation: Matrix3<f64>,
    #[serde(with = "serde_helpers::vec3_f64_from_array")]
    pub velocity: Vector3<f64>,
    #[serde(with = "serde_helpers::vec3_f64_from_array")]
    pub position: Vector3<f64>,
    #[serde(with = "serde_helpers::vec3_f64_from_array")]
    pub gyroscope_bias: Vector3<f64>,
    #[serde(with = "serde_helpers::vec3_f64_from_array")]
    pub accelerometer_bias: Vector3<f64>,
    /// Gravity in the world frame, in m/s^2.
    #[serde(with = "serde_helpers::vec3_f64_from_array")]
    pub gravity: Vector3<f64>,
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            // The IMU frame is rotated 180 degrees about the x-axis.
            rotation: Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0),
            velocity: Vector3::zeros(),
            position: Vector3::zeros(),
            gyroscope_bias: Vector3::zeros(),
            accelerometer_bias: Vector3::zeros(),
            gravity: Vector3::new(0.0, 0.0, -9.81),
        }
    }
}

/// Noise standard deviations. Each becomes an isotropic `std^2 * I` covariance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseSection {
    pub gyroscope: f64,
    pub accelerometer: f64,
    pub gyroscope_bias: f64,
    pub accelerometer_bias: f64,
    pub contact: f64,
}

impl Default for NoiseSection {
    fn default() -> Self {
        Self {
            gyroscope: 0.01,
            accelerometer: 0.1,
            gyroscope_bias: 0.00001,
            accelerometer_bias: 0.0001,
            contact: 0.01,
        }
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

impl ReplayConfig {
    /// Builds the layered configuration sources. A missing TOML file simply
    /// contributes nothing.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(ReplayConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("STRIDE_").split("__"))
    }

    /// Extracts and validates a configuration from prepared sources.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: ReplayConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(path))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ReplaySection { dt_min, dt_max, .. } = self.replay;
        // Written so that NaN bounds are rejected as well.
        if !(dt_min < dt_max) {
            return Err(ConfigError::EmptyDtWindow {
                min: dt_min,
                max: dt_max,
            });
        }
        Ok(())
    }

    // --- Conversions into core types ---

    pub fn dt_window(&self) -> DtWindow {
        DtWindow::new(self.replay.dt_min, self.replay.dt_max)
    }

    pub fn robot_state(&self) -> RobotState {
        let s = &self.initial_state;
        RobotState::new(
            s.rotation,
            s.velocity,
            s.position,
            s.gyroscope_bias,
            s.accelerometer_bias,
        )
    }

    pub fn noise_params(&self) -> NoiseParams {
        let n = &self.noise;
        let mut params = NoiseParams::default();
        params.set_gyroscope_noise(n.gyroscope);
        params.set_accelerometer_noise(n.accelerometer);
        params.set_gyroscope_bias_noise(n.gyroscope_bias);
        params.set_accelerometer_bias_noise(n.accelerometer_bias);
        params.set_contact_noise(n.contact);
        params
    }

    /// Creates the filter described by this configuration.
    pub fn build_filter(&self) -> InvariantEkf {
        InvariantEkf::new(self.robot_state(), self.noise_params())
            .with_gravity(self.initial_state.gravity)
    }
}
