// stride_core/src/replay/mod.rs

//! Drives an [`Estimator`] through a recorded log, one line at a time.

mod cursor;
mod sequencer;

pub use cursor::{DtWindow, PropagationStep, ReplayCursor, DEFAULT_DT_MAX, DEFAULT_DT_MIN};
pub use sequencer::{dispatch, sequence, EstimatorCall, Outcome};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{RecordError, ReplayError};
use crate::estimation::Estimator;
use crate::messages::LogEntry;
use crate::records::decode_line;

/// Counters collected over one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub imu_records: usize,
    pub contact_records: usize,
    pub kinematic_records: usize,
    pub unrecognized_records: usize,
    pub propagations: usize,
    /// IMU records whose interval fell outside the dt window.
    pub skipped_propagations: usize,
}

impl ReplayStats {
    pub fn records(&self) -> usize {
        self.imu_records + self.contact_records + self.kinematic_records + self.unrecognized_records
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Propagated { .. } => {
                self.imu_records += 1;
                self.propagations += 1;
            }
            Outcome::PropagationSkipped { .. } => {
                self.imu_records += 1;
                self.skipped_propagations += 1;
            }
            Outcome::ContactsSet { .. } => self.contact_records += 1,
            Outcome::Corrected { .. } => self.kinematic_records += 1,
            Outcome::Ignored => self.unrecognized_records += 1,
        }
    }
}

/// Owns the estimator for the lifetime of a replay, together with the cursor.
pub struct Replayer<E: Estimator> {
    estimator: E,
    cursor: ReplayCursor,
    window: DtWindow,
    stats: ReplayStats,
}

impl<E: Estimator> Replayer<E> {
    /// Creates a replayer with the default dt window.
    pub fn new(estimator: E) -> Self {
        Self::with_window(estimator, DtWindow::default())
    }

    pub fn with_window(estimator: E, window: DtWindow) -> Self {
        Self {
            estimator,
            cursor: ReplayCursor::default(),
            window,
            stats: ReplayStats::default(),
        }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn into_estimator(self) -> E {
        self.estimator
    }

    pub fn cursor(&self) -> &ReplayCursor {
        &self.cursor
    }

    pub fn window(&self) -> &DtWindow {
        &self.window
    }

    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    /// Sequences and dispatches one decoded entry.
    pub fn process_entry(&mut self, entry: LogEntry) -> Outcome {
        let kind = entry.kind();
        let (call, outcome) = sequence(&mut self.cursor, &self.window, entry);
        if let Some(call) = call {
            dispatch(&mut self.estimator, &call);
        }
        debug!(%kind, t = self.cursor.timestamp, ?outcome, "Processed record");
        self.stats.record(outcome);
        outcome
    }

    /// Decodes and processes one log line. A structural error leaves both the
    /// cursor and the estimator untouched.
    pub fn process_line(&mut self, line: &str) -> Result<Outcome, RecordError> {
        let entry = decode_line(line)?;
        Ok(self.process_entry(entry))
    }

    /// Replays every line of `reader`, stopping at the first structural error.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<ReplayStats, ReplayError> {
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            self.process_line(&line)
                .map_err(|source| ReplayError::Record {
                    line: index + 1,
                    source,
                })?;
        }
        info!(
            records = self.stats.records(),
            propagations = self.stats.propagations,
            skipped = self.stats.skipped_propagations,
            "Replay finished"
        );
        Ok(self.stats)
    }

    /// Opens `path` and replays it. A missing or unreadable file fails before
    /// any record is processed.
    pub fn replay_file(&mut self, path: impl AsRef<Path>) -> Result<ReplayStats, ReplayError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReplayError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Replaying log from: {:?}", path);
        self.run(BufReader::new(file))
    }
}
