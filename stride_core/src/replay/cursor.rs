// stride_core/src/replay/cursor.rs

use crate::types::ImuSample;

/// Default lower bound of the admissible propagation interval, in seconds.
pub const DEFAULT_DT_MIN: f64 = 1e-6;
/// Default upper bound of the admissible propagation interval, in seconds.
pub const DEFAULT_DT_MAX: f64 = 1.0;

/// The open interval `(min, max)` of inter-sample intervals for which a
/// propagation step is considered numerically valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DtWindow {
    pub min: f64,
    pub max: f64,
}

impl Default for DtWindow {
    fn default() -> Self {
        Self {
            min: DEFAULT_DT_MIN,
            max: DEFAULT_DT_MAX,
        }
    }
}

impl DtWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds are exclusive.
    pub fn admits(&self, dt: f64) -> bool {
        dt > self.min && dt < self.max
    }
}

/// The only state carried from one record to the next.
///
/// Starts at zero time with a zero IMU sample. It advances after every record,
/// whatever its kind, but the stored IMU sample only changes on IMU records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReplayCursor {
    /// Timestamp of the record currently being processed.
    pub timestamp: f64,
    /// Timestamp of the last record that advanced the cursor.
    pub previous_timestamp: f64,
    /// The last IMU sample seen. Propagation always integrates this sample,
    /// not the one that just arrived.
    pub previous_imu: ImuSample,
}

/// An admitted propagation: integrate `sample` over `dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationStep {
    pub sample: ImuSample,
    pub dt: f64,
}

impl ReplayCursor {
    /// Interval between `timestamp` and the last record of any kind.
    pub fn dt_to(&self, timestamp: f64) -> f64 {
        timestamp - self.previous_timestamp
    }

    /// The timestep gate. Returns the propagation to perform for an IMU record
    /// stamped `timestamp`, or `None` when the interval falls outside `window`.
    pub fn gate(&self, timestamp: f64, window: &DtWindow) -> Option<PropagationStep> {
        let dt = self.dt_to(timestamp);
        window.admits(dt).then_some(PropagationStep {
            sample: self.previous_imu,
            dt,
        })
    }

    /// Records that a record stamped `timestamp` has been fully processed.
    /// `imu` is the sample carried by that record, if it was an IMU record.
    pub fn advance(&mut self, timestamp: f64, imu: Option<&ImuSample>) {
        self.timestamp = timestamp;
        self.previous_timestamp = timestamp;
        if let Some(sample) = imu {
            self.previous_imu = *sample;
        }
    }
}
