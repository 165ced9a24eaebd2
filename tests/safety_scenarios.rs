// End-to-end admission scenarios from spec.md §8, exercised against the
// public `safebox::safety` API rather than safety.rs's in-file unit tests,
// so a reader can see the banker's-algorithm contract from outside the
// crate the way an external collaborator (CLI, future HTTP front end) would.

use safebox::safety::{Decision, SafetyEngine};
use safebox::{AdmissionError, ResourceVector};

fn v(values: &[u64]) -> ResourceVector {
    ResourceVector::new(values.to_vec())
}

fn names(arity: usize) -> Vec<String> {
    (0..arity).map(|i| format!("r{i}")).collect()
}

fn scenario_engine() -> SafetyEngine {
    let mut engine = SafetyEngine::new();
    engine.init(v(&[10, 5, 7]), names(3)).unwrap();
    engine.declare(0, "j0", v(&[7, 5, 3]), v(&[0, 1, 0])).unwrap();
    engine.declare(1, "j1", v(&[3, 2, 2]), v(&[2, 0, 0])).unwrap();
    engine.declare(2, "j2", v(&[9, 0, 2]), v(&[3, 0, 2])).unwrap();
    engine
}

#[test]
fn classical_safe_state_has_deterministic_safe_sequence() {
    let engine = scenario_engine();
    let snapshot = engine.state();
    assert_eq!(snapshot.available, vec![5, 4, 5]);
    assert!(snapshot.is_safe);
    assert_eq!(snapshot.safe_sequence, vec![1, 2, 0]);
}

#[test]
fn request_that_would_leave_no_safe_sequence_is_rejected_and_leaves_no_trace() {
    let mut engine = scenario_engine();
    let before = engine.state();
    let decision = engine.request(0, v(&[0, 2, 0]));
    assert_eq!(decision, Decision::Rejected(AdmissionError::UnsafeState));
    assert_eq!(engine.state().available, before.available);
    assert_eq!(engine.state().jobs.len(), before.jobs.len());
}

#[test]
fn grantable_request_updates_available_and_reports_safe_sequence() {
    let mut engine = scenario_engine();
    let decision = engine.request(1, v(&[1, 0, 2]));
    match decision {
        Decision::Granted { safe_sequence } => assert_eq!(safe_sequence, vec![1, 2, 0]),
        other => panic!("expected Granted, got {other:?}"),
    }
    assert_eq!(engine.state().available, vec![4, 4, 3]);
}

#[test]
fn detect_deadlock_reports_no_stuck_jobs_in_a_safe_state() {
    let engine = scenario_engine();
    let (no_deadlock, stuck) = engine.detect_deadlock();
    assert!(no_deadlock);
    assert!(stuck.is_empty());
}

#[test]
fn request_exceeding_declared_max_by_one_unit_is_rejected() {
    let mut engine = scenario_engine();
    // job 0: max [7,5,3], allocated [0,1,0] -> need [7,4,3]; one past need.
    let decision = engine.request(0, v(&[8, 0, 0]));
    assert_eq!(decision, Decision::Rejected(AdmissionError::ExceedsMax(0)));
}

#[test]
fn request_then_release_round_trips_allocation() {
    let mut engine = scenario_engine();
    let before = engine.state().available;
    assert!(matches!(engine.request(1, v(&[1, 0, 2])), Decision::Granted { .. }));
    engine.release(1, v(&[1, 0, 2])).unwrap();
    assert_eq!(engine.state().available, before);
}

#[test]
fn declare_then_release_all_restores_available_to_totals() {
    let mut engine = SafetyEngine::new();
    engine.init(v(&[4, 4]), names(2)).unwrap();
    engine.declare(0, "solo", v(&[4, 4]), v(&[2, 2])).unwrap();
    engine.release_all(0).unwrap();
    let snapshot = engine.state();
    assert_eq!(snapshot.available, vec![4, 4]);
    assert!(snapshot.jobs.is_empty());
    assert!(snapshot.is_safe);
}

#[test]
fn zero_request_is_always_granted_and_does_not_alter_safety() {
    let mut engine = scenario_engine();
    let before = engine.state();
    let decision = engine.request(2, v(&[0, 0, 0]));
    assert!(matches!(decision, Decision::Granted { .. }));
    assert_eq!(engine.state().available, before.available);
}

#[test]
fn mismatched_arity_is_a_hard_error_never_padded_or_truncated() {
    let mut engine = SafetyEngine::new();
    engine.init(v(&[10, 10]), names(2)).unwrap();
    let err = engine.declare(0, "x", v(&[1, 1, 1]), v(&[0, 0, 0])).unwrap_err();
    assert_eq!(err, AdmissionError::ArityMismatch { given: 3, expected: 2 });
}
