//! Error types for the phaseflow engine.
//!
//! Three families live here:
//!
//! - [`PhaseflowError`]: crate-level errors returned synchronously from
//!   configuration loading, dependency lookup and build-log persistence.
//! - [`PlatformError`]: domain errors that phase implementations raise from
//!   `execute`. The runner inspects them to decide whether a failure is
//!   retryable.
//! - [`PipelineValidationError`]: a structured report produced by
//!   pipeline-wide referential validation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for phaseflow operations.
#[derive(Debug, Error)]
pub enum PhaseflowError {
    /// Pipeline-wide validation failed.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A domain error raised by a phase collaborator.
    #[error("{0}")]
    Platform(#[from] PlatformError),

    /// A phase asked for a service that was never injected.
    #[error("Dependency '{name}' not found in {owner}")]
    DependencyNotInjected {
        /// The phase that owns the dependency container.
        owner: String,
        /// The requested dependency name.
        name: String,
    },

    /// Invalid orchestrator configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Category of a [`PlatformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformErrorKind {
    /// Fetching remote data failed.
    DataFetch,
    /// An analysis step failed.
    Analysis,
    /// Input data did not satisfy a precondition.
    Validation,
    /// A collaborator was misconfigured.
    Configuration,
    /// A cache read or write failed.
    Cache,
    /// A remote API refused the request because of rate limiting.
    RateLimit,
}

impl fmt::Display for PlatformErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataFetch => write!(f, "data_fetch"),
            Self::Analysis => write!(f, "analysis"),
            Self::Validation => write!(f, "validation"),
            Self::Configuration => write!(f, "configuration"),
            Self::Cache => write!(f, "cache"),
            Self::RateLimit => write!(f, "rate_limit"),
        }
    }
}

/// A domain error raised from inside a phase.
///
/// Validation-class errors are deterministic and never retried. A rate
/// limit error may carry a `retry_after` hint, which stretches the backoff
/// before the next attempt.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlatformError {
    /// Error category.
    pub kind: PlatformErrorKind,
    /// Human readable message.
    pub message: String,
    /// Structured details for diagnostics.
    pub details: HashMap<String, serde_json::Value>,
    /// Minimum wait before retrying (rate limits only).
    pub retry_after: Option<Duration>,
}

impl PlatformError {
    /// Creates a new platform error.
    #[must_use]
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: HashMap::new(),
            retry_after: None,
        }
    }

    /// Creates a data fetch error.
    #[must_use]
    pub fn data_fetch(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::DataFetch, message)
    }

    /// Creates an analysis error.
    #[must_use]
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Analysis, message)
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Validation, message)
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Configuration, message)
    }

    /// Creates a cache error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Cache, message)
    }

    /// Creates a rate limit error with an optional retry hint.
    #[must_use]
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(PlatformErrorKind::RateLimit, message)
        }
    }

    /// Adds a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Returns true for deterministic validation failures.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.kind == PlatformErrorKind::Validation
    }

    /// Converts to a JSON object.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "kind": self.kind,
            "message": self.message,
            "details": self.details,
        });
        if let Some(retry_after) = self.retry_after {
            value["retry_after"] = serde_json::json!(retry_after.as_secs_f64());
        }
        value
    }
}

/// A single problem found by pipeline-wide validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A dependency key that no phase name, earlier declared output or
    /// initial key accounts for.
    UnknownDependency {
        /// The phase declaring the dependency.
        phase: String,
        /// The unresolved dependency key.
        dependency: String,
    },
    /// Two registered phases share a name.
    DuplicatePhase {
        /// The repeated name.
        phase: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDependency { phase, dependency } => {
                write!(f, "Phase {phase} has unknown dependency: {dependency}")
            }
            Self::DuplicatePhase { phase } => {
                write!(f, "Phase name '{phase}' is registered more than once")
            }
        }
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("Pipeline validation failed: {}", join_issues(.issues))]
pub struct PipelineValidationError {
    /// Every problem found, in registration order.
    pub issues: Vec<ValidationIssue>,
}

impl PipelineValidationError {
    /// Creates a validation error from the collected issues.
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Returns the names of the phases involved.
    #[must_use]
    pub fn phases(&self) -> Vec<&str> {
        self.issues
            .iter()
            .map(|issue| match issue {
                ValidationIssue::UnknownDependency { phase, .. }
                | ValidationIssue::DuplicatePhase { phase } => phase.as_str(),
            })
            .collect()
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_constructors() {
        let err = PlatformError::data_fetch("GitHub returned 502")
            .with_detail("status", serde_json::json!(502));

        assert_eq!(err.kind, PlatformErrorKind::DataFetch);
        assert_eq!(err.to_string(), "GitHub returned 502");
        assert_eq!(err.details.get("status"), Some(&serde_json::json!(502)));
        assert!(!err.is_validation());
        assert!(PlatformError::validation("bad input").is_validation());
    }

    #[test]
    fn test_rate_limit_to_dict() {
        let err = PlatformError::rate_limit("slow down", Some(Duration::from_secs(30)));
        let dict = err.to_dict();

        assert_eq!(dict["kind"], "rate_limit");
        assert_eq!(dict["retry_after"], 30.0);
    }

    #[test]
    fn test_validation_error_message() {
        let err = PipelineValidationError::new(vec![
            ValidationIssue::UnknownDependency {
                phase: "analyze".to_string(),
                dependency: "repos".to_string(),
            },
            ValidationIssue::DuplicatePhase {
                phase: "fetch_data".to_string(),
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("Phase analyze has unknown dependency: repos"));
        assert!(message.contains("'fetch_data' is registered more than once"));
        assert_eq!(err.phases(), vec!["analyze", "fetch_data"]);
    }

    #[test]
    fn test_phaseflow_error_from_platform() {
        let err: PhaseflowError = PlatformError::cache("disk full").into();
        assert!(matches!(err, PhaseflowError::Platform(_)));
        assert_eq!(err.to_string(), "disk full");
    }
}
