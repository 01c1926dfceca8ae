// stride_core/src/replay/sequencer.rs

use super::cursor::{DtWindow, ReplayCursor};
use crate::estimation::Estimator;
use crate::messages::LogEntry;
use crate::types::{ContactSet, ImuSample, KinematicBatch};

/// The estimator operation a single log entry maps to.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorCall {
    Propagate { sample: ImuSample, dt: f64 },
    SetContacts(ContactSet),
    CorrectKinematics(KinematicBatch),
}

/// What happened to one log entry. Used for reporting and statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Propagated { dt: f64 },
    /// An IMU record whose interval fell outside the window.
    PropagationSkipped { dt: f64 },
    ContactsSet { count: usize },
    Corrected { count: usize },
    Ignored,
}

/// Threads the cursor through one entry and decides which estimator call, if
/// any, it produces. Pure apart from the cursor update, so it can be tested
/// without an estimator.
pub fn sequence(
    cursor: &mut ReplayCursor,
    window: &DtWindow,
    entry: LogEntry,
) -> (Option<EstimatorCall>, Outcome) {
    match entry {
        LogEntry::Imu { timestamp, sample } => {
            let step = cursor.gate(timestamp, window);
            let dt = cursor.dt_to(timestamp);
            cursor.advance(timestamp, Some(&sample));
            match step {
                Some(step) => (
                    Some(EstimatorCall::Propagate {
                        sample: step.sample,
                        dt: step.dt,
                    }),
                    Outcome::Propagated { dt: step.dt },
                ),
                None => (None, Outcome::PropagationSkipped { dt }),
            }
        }
        LogEntry::Contact {
            timestamp,
            contacts,
        } => {
            cursor.advance(timestamp, None);
            let count = contacts.len();
            (
                Some(EstimatorCall::SetContacts(contacts)),
                Outcome::ContactsSet { count },
            )
        }
        LogEntry::Kinematic {
            timestamp,
            measurements,
        } => {
            cursor.advance(timestamp, None);
            let count = measurements.len();
            (
                Some(EstimatorCall::CorrectKinematics(measurements)),
                Outcome::Corrected { count },
            )
        }
        LogEntry::Unrecognized { timestamp, .. } => {
            if let Some(timestamp) = timestamp {
                cursor.advance(timestamp, None);
            }
            (None, Outcome::Ignored)
        }
    }
}

/// Applies a call to the estimator. Calls never fail.
pub fn dispatch<E: Estimator + ?Sized>(estimator: &mut E, call: &EstimatorCall) {
    match call {
        EstimatorCall::Propagate { sample, dt } => estimator.propagate(sample, *dt),
        EstimatorCall::SetContacts(contacts) => estimator.set_contacts(contacts),
        EstimatorCall::CorrectKinematics(measurements) => {
            estimator.correct_kinematics(measurements)
        }
    }
}
