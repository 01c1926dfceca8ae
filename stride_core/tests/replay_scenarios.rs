// stride_core/tests/replay_scenarios.rs

use std::io::Cursor;

use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Matrix6, Vector3};
use stride_core::error::{FieldCount, RecordError, ReplayError};
use stride_core::prelude::*;

/// Records every call it receives instead of estimating anything.
#[derive(Default)]
struct RecordingEstimator {
    propagations: Vec<(ImuSample, f64)>,
    contacts: Vec<ContactSet>,
    corrections: Vec<KinematicBatch>,
    state: RobotState,
    noise: NoiseParams,
}

impl RecordingEstimator {
    fn call_count(&self) -> usize {
        self.propagations.len() + self.contacts.len() + self.corrections.len()
    }
}

impl Estimator for RecordingEstimator {
    fn propagate(&mut self, imu: &ImuSample, dt: f64) {
        self.propagations.push((*imu, dt));
    }

    fn set_contacts(&mut self, contacts: &ContactSet) {
        self.contacts.push(contacts.clone());
    }

    fn correct_kinematics(&mut self, measurements: &KinematicBatch) {
        self.corrections.push(measurements.clone());
    }

    fn state(&self) -> &RobotState {
        &self.state
    }

    fn noise_params(&self) -> &NoiseParams {
        &self.noise
    }
}

fn kinematic_line(t: f64, blocks: &[(i32, [f64; 4], [f64; 3])]) -> String {
    let mut line = format!("KINEMATIC {}", t);
    for (id, q, p) in blocks {
        line.push_str(&format!(" {}", id));
        for v in q.iter().chain(p.iter()) {
            line.push_str(&format!(" {}", v));
        }
        let identity = Matrix6::<f64>::identity();
        for j in 0..6 {
            for k in 0..6 {
                line.push_str(&format!(" {}", identity[(j, k)]));
            }
        }
    }
    line
}

fn replay(log: &str) -> (Replayer<RecordingEstimator>, Result<ReplayStats, ReplayError>) {
    let mut replayer = Replayer::new(RecordingEstimator::default());
    let result = replayer.run(Cursor::new(log.to_string()));
    (replayer, result)
}

#[test]
fn scenario_consecutive_imu_records_propagate_with_the_earlier_sample() {
    let (replayer, result) = replay("IMU 0.0 0 0 0 0 0 9.81\nIMU 0.1 0 0 0 0 0 9.81\n");
    result.unwrap();

    let calls = &replayer.estimator().propagations;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, ImuSample::new(0.0, 0.0, 0.0, 0.0, 0.0, 9.81));
    assert_abs_diff_eq!(calls[0].1, 0.1, epsilon = 1e-12);
}

#[test]
fn propagation_lags_by_one_sample() {
    let log = "IMU 0.00 1 0 0 0 0 0\nIMU 0.01 2 0 0 0 0 0\nIMU 0.02 3 0 0 0 0 0\n";
    let (replayer, result) = replay(log);
    let stats = result.unwrap();

    let integrated: Vec<f64> = replayer
        .estimator()
        .propagations
        .iter()
        .map(|(sample, _)| sample[0])
        .collect();
    assert_eq!(integrated, vec![1.0, 2.0]);
    assert_eq!(stats.propagations, 2);
    assert_eq!(stats.skipped_propagations, 1);
}

#[test]
fn out_of_window_intervals_skip_propagation_but_advance_the_cursor() {
    // Duplicate timestamp, reordering, then a 2 s gap.
    let log = concat!(
        "IMU 1.0 0 0 0 0 0 1\n",
        "IMU 1.0 0 0 0 0 0 2\n",
        "IMU 0.5 0 0 0 0 0 3\n",
        "IMU 2.5 0 0 0 0 0 4\n",
        "IMU 2.6 0 0 0 0 0 5\n",
    );
    let (replayer, result) = replay(log);
    result.unwrap();

    let calls = &replayer.estimator().propagations;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0[5], 4.0);
    assert_abs_diff_eq!(calls[0].1, 0.1, epsilon = 1e-12);
    assert_eq!(replayer.cursor().previous_timestamp, 2.6);
}

#[test]
fn scenario_contact_record_decodes_pairs_in_order() {
    let (replayer, result) = replay("CONTACT 1.0 0 1 1 0\n");
    result.unwrap();
    assert_eq!(
        replayer.estimator().contacts,
        vec![vec![(0, true), (1, false)]]
    );
}

#[test]
fn contacts_are_applied_without_gating() {
    let (replayer, result) = replay("CONTACT 0.0 0 1\nCONTACT 0.0 0 0\nCONTACT 9.0 0 1\n");
    result.unwrap();
    assert_eq!(replayer.estimator().contacts.len(), 3);
}

#[test]
fn scenario_single_kinematic_block_with_identity_rotation() {
    let line = kinematic_line(2.0, &[(0, [1.0, 0.0, 0.0, 0.0], [1.0, 2.0, 3.0])]);
    let (replayer, result) = replay(&line);
    result.unwrap();

    let corrections = &replayer.estimator().corrections;
    assert_eq!(corrections.len(), 1);
    let measurement = &corrections[0][0];
    assert_eq!(measurement.id, 0);
    assert_abs_diff_eq!(measurement.rotation(), Matrix3::identity(), epsilon = 1e-12);
    assert_eq!(measurement.translation(), Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(measurement.covariance, Matrix6::identity());
}

#[test]
fn kinematic_batch_is_passed_as_one_correction() {
    let line = kinematic_line(
        2.0,
        &[
            (0, [1.0, 0.0, 0.0, 0.0], [0.1, 0.0, -0.5]),
            (1, [0.0, 0.0, 0.0, 3.0], [-0.1, 0.0, -0.5]),
        ],
    );
    let (replayer, result) = replay(&line);
    result.unwrap();

    let corrections = &replayer.estimator().corrections;
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].len(), 2);
    // (0, 0, 0, 3) normalizes to a half turn about z.
    let rotation = corrections[0][1].rotation();
    assert_abs_diff_eq!(
        rotation,
        Matrix3::new(-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0),
        epsilon = 1e-12
    );
}

#[test]
fn scenario_unrecognized_record_only_advances_the_cursor() {
    let (replayer, result) = replay("UNKNOWN 1.0 5 6 7\n");
    let stats = result.unwrap();
    assert_eq!(replayer.estimator().call_count(), 0);
    assert_eq!(replayer.cursor().previous_timestamp, 1.0);
    assert_eq!(stats.unrecognized_records, 1);
}

#[test]
fn non_imu_records_shift_the_propagation_interval() {
    let log = "IMU 1.0 0 0 0 0 0 7\nUNKNOWN 1.4\nIMU 1.5 0 0 0 0 0 8\n";
    let (replayer, result) = replay(log);
    result.unwrap();
    let calls = &replayer.estimator().propagations;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0[5], 7.0);
    assert_abs_diff_eq!(calls[0].1, 0.1, epsilon = 1e-12);
}

#[test]
fn scenario_short_imu_record_aborts_the_replay() {
    let log = "UNKNOWN 0.9\nIMU 1.0 0 0 0 0 0\nIMU 1.1 0 0 0 0 0 1\nCONTACT 1.2 0 1\n";
    let (replayer, result) = replay(log);

    match result {
        Err(ReplayError::Record { line, source }) => {
            assert_eq!(line, 2);
            assert_eq!(
                source,
                RecordError::FieldCount {
                    kind: RecordKind::Imu,
                    expected: FieldCount::Exactly(6),
                    found: 5,
                }
            );
        }
        other => panic!("expected a record error, got {:?}", other),
    }
    assert_eq!(replayer.estimator().call_count(), 0);
    assert_eq!(replayer.cursor().previous_timestamp, 0.9);
}

#[test]
fn every_recognized_kind_rejects_a_bad_field_count() {
    let bad_lines = [
        "IMU 1.0 0 0 0 0 0 0 0".to_string(),
        "CONTACT 1.0 0 1 2".to_string(),
        format!("{} 0", kinematic_line(1.0, &[(0, [1.0, 0.0, 0.0, 0.0], [0.0; 3])])),
        "KINEMATIC 1.0".to_string(),
    ];
    for line in &bad_lines {
        let (replayer, result) = replay(line);
        assert!(
            matches!(
                result,
                Err(ReplayError::Record {
                    line: 1,
                    source: RecordError::FieldCount { .. }
                })
            ),
            "line {:?} was accepted",
            line
        );
        assert_eq!(replayer.estimator().call_count(), 0);
    }
}

#[test]
fn unparseable_numbers_abort_the_replay() {
    let (_, result) = replay("CONTACT 1.0 left 1\n");
    assert!(matches!(
        result,
        Err(ReplayError::Record {
            source: RecordError::InvalidInteger { position: 2, .. },
            ..
        })
    ));
}

#[test]
fn missing_log_file_fails_before_processing() {
    let mut replayer = Replayer::new(RecordingEstimator::default());
    let result = replayer.replay_file("/nonexistent/stride/log.txt");
    assert!(matches!(result, Err(ReplayError::Open { .. })));
    assert_eq!(replayer.stats().records(), 0);
}

#[test]
fn custom_window_changes_gating() {
    let window = DtWindow::new(0.0, 5.0);
    let mut replayer = Replayer::with_window(RecordingEstimator::default(), window);
    replayer
        .run(Cursor::new("IMU 0.0 0 0 0 0 0 1\nIMU 2.0 0 0 0 0 0 1\n"))
        .unwrap();
    assert_eq!(replayer.estimator().propagations.len(), 1);
}

#[test]
fn invariant_filter_runs_a_short_gait() {
    let mut log = String::new();
    let mut t = 0.0;
    for step in 0..50 {
        log.push_str(&format!("IMU {:.3} 0 0 0 0 0 9.81\n", t));
        if step == 10 {
            log.push_str(&format!("CONTACT {:.3} 0 1 1 1\n", t));
        }
        if step >= 10 && step % 5 == 0 {
            log.push_str(&kinematic_line(
                t,
                &[
                    (0, [1.0, 0.0, 0.0, 0.0], [0.2, 0.1, -0.5]),
                    (1, [1.0, 0.0, 0.0, 0.0], [-0.2, 0.1, -0.5]),
                ],
            ));
            log.push('\n');
        }
        t += 0.01;
    }

    let filter = InvariantEkf::new(RobotState::default(), NoiseParams::default());
    let mut replayer = Replayer::new(filter);
    let stats = replayer.run(Cursor::new(log)).unwrap();
    assert_eq!(stats.imu_records, 50);
    assert_eq!(stats.contact_records, 1);

    let filter = replayer.into_estimator();
    assert_eq!(filter.state().contact_count(), 2);
    assert_abs_diff_eq!(filter.state().position(), Vector3::zeros(), epsilon = 1e-6);
}
