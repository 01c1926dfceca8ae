// stride_core/src/error.rs

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::messages::RecordKind;

/// The field count a recognized record kind must carry after its tag and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCount {
    Exactly(usize),
    /// Any multiple of the stride, including zero.
    MultipleOf(usize),
    /// A multiple of the stride that is at least one stride long.
    PositiveMultipleOf(usize),
}

impl FieldCount {
    pub fn admits(&self, found: usize) -> bool {
        match *self {
            FieldCount::Exactly(n) => found == n,
            FieldCount::MultipleOf(stride) => found % stride == 0,
            FieldCount::PositiveMultipleOf(stride) => found > 0 && found % stride == 0,
        }
    }
}

impl fmt::Display for FieldCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCount::Exactly(n) => write!(f, "exactly {}", n),
            FieldCount::MultipleOf(stride) => write!(f, "a multiple of {}", stride),
            FieldCount::PositiveMultipleOf(stride) => {
                write!(f, "a positive multiple of {}", stride)
            }
        }
    }
}

/// A structural problem with a single log line. Always fatal for the replay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("empty record")]
    Empty,

    #[error("{kind} record has no timestamp")]
    MissingTimestamp { kind: RecordKind },

    #[error("{kind} record carries {found} fields after the timestamp, expected {expected}")]
    FieldCount {
        kind: RecordKind,
        expected: FieldCount,
        found: usize,
    },

    #[error("field {position} ({token:?}) is not a valid number")]
    InvalidFloat { position: usize, token: String },

    #[error("field {position} ({token:?}) is not a valid integer")]
    InvalidInteger { position: usize, token: String },
}

/// Errors that stop a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("could not open replay log {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read replay log")]
    Io(#[from] std::io::Error),

    /// `line` is 1-based.
    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },
}
