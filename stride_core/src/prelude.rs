// stride_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::Estimator;
pub use crate::messages::{LogEntry, RecordKind};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::estimation::{NoiseParams, RobotState};
pub use crate::types::{ContactId, ContactSet, ImuSample, KinematicBatch, KinematicMeasurement};

// --- Replay Pipeline ---
pub use crate::error::{RecordError, ReplayError};
pub use crate::records::decode_line;
pub use crate::replay::{DtWindow, ReplayCursor, ReplayStats, Replayer};

// --- Concrete Estimator Implementations ---
pub use crate::estimation::filters::inekf::InvariantEkf;
