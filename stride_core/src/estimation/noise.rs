// stride_core/src/estimation/noise.rs

use std::fmt;

use nalgebra::Matrix3;

/// Continuous-time noise model of the inertial sensors and contact points.
///
/// Every term is stored as a 3x3 covariance. The `set_*_noise` helpers take a
/// standard deviation and build an isotropic covariance `std^2 * I`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseParams {
    gyroscope_cov: Matrix3<f64>,
    accelerometer_cov: Matrix3<f64>,
    gyroscope_bias_cov: Matrix3<f64>,
    accelerometer_bias_cov: Matrix3<f64>,
    contact_cov: Matrix3<f64>,
}

impl Default for NoiseParams {
    fn default() -> Self {
        let mut params = Self {
            gyroscope_cov: Matrix3::zeros(),
            accelerometer_cov: Matrix3::zeros(),
            gyroscope_bias_cov: Matrix3::zeros(),
            accelerometer_bias_cov: Matrix3::zeros(),
            contact_cov: Matrix3::zeros(),
        };
        params.set_gyroscope_noise(0.01);
        params.set_accelerometer_noise(0.1);
        params.set_gyroscope_bias_noise(0.00001);
        params.set_accelerometer_bias_noise(0.0001);
        params.set_contact_noise(0.1);
        params
    }
}

fn isotropic(std: f64) -> Matrix3<f64> {
    Matrix3::identity() * (std * std)
}

impl NoiseParams {
    pub fn set_gyroscope_noise(&mut self, std: f64) {
        self.gyroscope_cov = isotropic(std);
    }

    pub fn set_accelerometer_noise(&mut self, std: f64) {
        self.accelerometer_cov = isotropic(std);
    }

    pub fn set_gyroscope_bias_noise(&mut self, std: f64) {
        self.gyroscope_bias_cov = isotropic(std);
    }

    pub fn set_accelerometer_bias_noise(&mut self, std: f64) {
        self.accelerometer_bias_cov = isotropic(std);
    }

    pub fn set_contact_noise(&mut self, std: f64) {
        self.contact_cov = isotropic(std);
    }

    pub fn gyroscope_cov(&self) -> &Matrix3<f64> {
        &self.gyroscope_cov
    }

    pub fn accelerometer_cov(&self) -> &Matrix3<f64> {
        &self.accelerometer_cov
    }

    pub fn gyroscope_bias_cov(&self) -> &Matrix3<f64> {
        &self.gyroscope_bias_cov
    }

    pub fn accelerometer_bias_cov(&self) -> &Matrix3<f64> {
        &self.accelerometer_bias_cov
    }

    pub fn contact_cov(&self) -> &Matrix3<f64> {
        &self.contact_cov
    }
}

impl fmt::Display for NoiseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            gyroscope_cov,
            accelerometer_cov,
            gyroscope_bias_cov,
            accelerometer_bias_cov,
            contact_cov,
        } = self;
        writeln!(f, "Gyroscope Covariance:{gyroscope_cov}")?;
        writeln!(f, "Accelerometer Covariance:{accelerometer_cov}")?;
        writeln!(f, "Gyroscope Bias Covariance:{gyroscope_bias_cov}")?;
        writeln!(f, "Accelerometer Bias Covariance:{accelerometer_bias_cov}")?;
        write!(f, "Contact Covariance:{contact_cov}")
    }
}
