//! Pipeline lifecycle event type.

use crate::core::{FailureKind, PhaseKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A lifecycle event of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A run began.
    PipelineStarted {
        /// Run identifier.
        run_id: Uuid,
        /// Number of registered phases.
        phases: usize,
    },
    /// An enabled phase is about to run its first attempt.
    PhaseStarted {
        /// Phase name.
        phase: String,
        /// Phase kind.
        kind: PhaseKind,
    },
    /// An attempt failed and another one will follow after `delay_ms`.
    PhaseRetrying {
        /// Phase name.
        phase: String,
        /// The attempt that just failed (1-based).
        attempt: u32,
        /// Backoff before the next attempt.
        delay_ms: u64,
        /// Error summary of the failed attempt.
        error: String,
    },
    /// A phase succeeded and its data was merged.
    PhaseCompleted {
        /// Phase name.
        phase: String,
        /// The successful attempt (1-based).
        attempt: u32,
        /// Duration of the successful attempt.
        duration_ms: f64,
    },
    /// A phase failed for good.
    PhaseFailed {
        /// Phase name.
        phase: String,
        /// The last attempt made (1-based).
        attempt: u32,
        /// Failure classification.
        failure: Option<FailureKind>,
        /// Error summary.
        error: String,
        /// Whether this failure stops the run.
        critical: bool,
    },
    /// A disabled phase was skipped.
    PhaseSkipped {
        /// Phase name.
        phase: String,
    },
    /// A run finished.
    PipelineCompleted {
        /// Run identifier.
        run_id: Uuid,
        /// Overall success.
        success: bool,
        /// Number of completed phases.
        completed: usize,
        /// Number of failed phases.
        failed: usize,
        /// Run duration.
        duration_ms: f64,
    },
}

impl PipelineEvent {
    /// Returns the dotted event type, e.g. `phase.started`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PipelineStarted { .. } => "pipeline.started",
            Self::PhaseStarted { .. } => "phase.started",
            Self::PhaseRetrying { .. } => "phase.retrying",
            Self::PhaseCompleted { .. } => "phase.completed",
            Self::PhaseFailed { .. } => "phase.failed",
            Self::PhaseSkipped { .. } => "phase.skipped",
            Self::PipelineCompleted { .. } => "pipeline.completed",
        }
    }

    /// Returns the phase the event concerns, if any.
    #[must_use]
    pub fn phase(&self) -> Option<&str> {
        match self {
            Self::PhaseStarted { phase, .. }
            | Self::PhaseRetrying { phase, .. }
            | Self::PhaseCompleted { phase, .. }
            | Self::PhaseFailed { phase, .. }
            | Self::PhaseSkipped { phase } => Some(phase),
            Self::PipelineStarted { .. } | Self::PipelineCompleted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_phase() {
        let event = PipelineEvent::PhaseSkipped {
            phase: "render".to_string(),
        };
        assert_eq!(event.event_type(), "phase.skipped");
        assert_eq!(event.phase(), Some("render"));

        let event = PipelineEvent::PipelineStarted {
            run_id: Uuid::new_v4(),
            phases: 2,
        };
        assert_eq!(event.event_type(), "pipeline.started");
        assert_eq!(event.phase(), None);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = PipelineEvent::PhaseFailed {
            phase: "fetch_data".to_string(),
            attempt: 3,
            failure: Some(FailureKind::Timeout),
            error: "timed out".to_string(),
            critical: true,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_failed");
        assert_eq!(json["failure"], "timeout");
        assert_eq!(json["critical"], true);
    }
}
