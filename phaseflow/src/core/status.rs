//! Phase kind and failure classification enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a phase performs.
///
/// The kind is chosen when the phase is configured and is only used for
/// logging, events and the execution plan. It never changes how the
/// orchestrator treats the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Pulls data from an external source (e.g., repository listings, paper metadata).
    Fetch,
    /// Derives metrics or models from data already in the context.
    Analysis,
    /// Produces artifacts such as reports, pages or charts.
    Generation,
    /// Anything else: setup, housekeeping, glue.
    #[default]
    Utility,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Analysis => write!(f, "analysis"),
            Self::Generation => write!(f, "generation"),
            Self::Utility => write!(f, "utility"),
        }
    }
}

/// Why a phase attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required context key was missing.
    Dependency,
    /// `validate_input` rejected the context, or the phase raised a
    /// validation-class domain error.
    Validation,
    /// The attempt exceeded the phase timeout.
    Timeout,
    /// `execute` returned an error.
    Execution,
    /// The phase panicked.
    Panic,
}

impl FailureKind {
    /// Returns true if another attempt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::Execution)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependency => write!(f, "dependency"),
            Self::Validation => write!(f, "validation"),
            Self::Timeout => write!(f, "timeout"),
            Self::Execution => write!(f, "execution"),
            Self::Panic => write!(f, "panic"),
        }
    }
}
