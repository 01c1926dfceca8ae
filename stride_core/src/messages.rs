// stride_core/src/messages.rs

use std::fmt;

use crate::types::{ContactSet, ImuSample, KinematicBatch};

// =========================================================================
// == Record Kinds ==
// =========================================================================

/// The closed set of record kinds a log line can be classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Imu,
    Contact,
    Kinematic,
    /// Any tag we do not understand. These records are skipped, never rejected.
    Unrecognized,
}

impl RecordKind {
    /// Classifies a type tag. Matching is exact and case-sensitive.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "IMU" => RecordKind::Imu,
            "CONTACT" => RecordKind::Contact,
            "KINEMATIC" => RecordKind::Kinematic,
            _ => RecordKind::Unrecognized,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            RecordKind::Imu => "IMU",
            RecordKind::Contact => "CONTACT",
            RecordKind::Kinematic => "KINEMATIC",
            RecordKind::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =========================================================================
// == Decoded Log Entries ==
// =========================================================================

/// A fully decoded log line. Each entry is owned by the dispatch step that
/// consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Imu {
        timestamp: f64,
        sample: ImuSample,
    },
    Contact {
        timestamp: f64,
        contacts: ContactSet,
    },
    Kinematic {
        timestamp: f64,
        measurements: KinematicBatch,
    },
    Unrecognized {
        tag: String,
        /// Parsed on a best-effort basis; `None` if absent or not a number.
        timestamp: Option<f64>,
    },
}

impl LogEntry {
    pub fn kind(&self) -> RecordKind {
        match self {
            LogEntry::Imu { .. } => RecordKind::Imu,
            LogEntry::Contact { .. } => RecordKind::Contact,
            LogEntry::Kinematic { .. } => RecordKind::Kinematic,
            LogEntry::Unrecognized { .. } => RecordKind::Unrecognized,
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        match self {
            LogEntry::Imu { timestamp, .. }
            | LogEntry::Contact { timestamp, .. }
            | LogEntry::Kinematic { timestamp, .. } => Some(*timestamp),
            LogEntry::Unrecognized { timestamp, .. } => *timestamp,
        }
    }
}
