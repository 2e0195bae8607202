//! Test assertions for phase and pipeline results.

use std::collections::HashSet;

use crate::core::{FailureKind, PhaseResult};
use crate::pipeline::PipelineResult;

/// Asserts that the phase result indicates success.
pub fn assert_phase_succeeded(result: &PhaseResult) {
    assert!(
        result.success,
        "Expected phase '{}' to succeed, got errors: {:?}",
        result.phase_name, result.errors
    );
}

/// Asserts that the phase result failed with the given kind.
pub fn assert_phase_failed(result: &PhaseResult, kind: FailureKind) {
    assert!(
        !result.success,
        "Expected phase '{}' to fail, but it succeeded",
        result.phase_name
    );
    assert_eq!(
        result.failure,
        Some(kind),
        "Expected failure kind {kind} for phase '{}', got {:?}",
        result.phase_name,
        result.failure
    );
}

/// Asserts that the phase result carries a specific data key.
pub fn assert_phase_contains(result: &PhaseResult, key: &str) {
    assert!(
        result.data.contains_key(key),
        "Expected phase '{}' data to contain key '{}'. Keys: {:?}",
        result.phase_name,
        key,
        result.data.keys().collect::<Vec<_>>()
    );
}

/// Asserts that the pipeline succeeded.
pub fn assert_pipeline_succeeded(result: &PipelineResult) {
    assert!(
        result.success,
        "Expected pipeline to succeed, got errors: {:?}",
        result.errors
    );
}

/// Asserts that the pipeline failed.
pub fn assert_pipeline_failed(result: &PipelineResult) {
    assert!(!result.success, "Expected pipeline to fail, but it succeeded");
}

/// Asserts the exact list of completed phases.
pub fn assert_phases_completed(result: &PipelineResult, expected: &[&str]) {
    assert_eq!(
        result.phases_completed, expected,
        "Unexpected completed phases"
    );
}

/// Asserts the exact list of failed phases.
pub fn assert_phases_failed(result: &PipelineResult, expected: &[&str]) {
    assert_eq!(result.phases_failed, expected, "Unexpected failed phases");
}

/// Asserts that the final context holds `expected` under `key`.
pub fn assert_context_value(result: &PipelineResult, key: &str, expected: &serde_json::Value) {
    let actual = result.data.get(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected value {expected:?} for context key '{key}', got {actual:?}"
    );
}

/// Asserts the structural invariants every pipeline result must hold.
///
/// `success` matches the failure lists, completed and failed phases are
/// disjoint, and every failed phase has an error entry.
pub fn assert_result_shape(result: &PipelineResult) {
    assert_eq!(
        result.success,
        result.phases_failed.is_empty() && result.errors.is_empty(),
        "success flag disagrees with failures"
    );

    let completed: HashSet<&String> = result.phases_completed.iter().collect();
    for failed in &result.phases_failed {
        assert!(
            !completed.contains(failed),
            "Phase '{failed}' is both completed and failed"
        );
        assert!(
            result.errors.contains_key(failed),
            "Failed phase '{failed}' has no error entry"
        );
    }
}
