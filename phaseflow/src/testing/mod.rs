//! Testing utilities for phaseflow pipelines.
//!
//! This module provides:
//! - Mock phases with call tracking
//! - Assertions for phase and pipeline results
//! - A pipeline test harness with a collecting event sink

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_context_value, assert_phase_contains, assert_phase_failed, assert_phase_succeeded,
    assert_phases_completed, assert_phases_failed, assert_pipeline_failed,
    assert_pipeline_succeeded, assert_result_shape,
};
pub use fixtures::{context_data, fast_config, TestPipeline};
pub use mocks::{
    ExecutionLog, FailingPhase, FlakyPhase, PanickingPhase, RecordingPhase, RejectingPhase,
    ServicePhase, SlowPhase, SuccessPhase,
};
