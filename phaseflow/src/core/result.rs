//! Per-phase execution result.

use super::FailureKind;
use crate::context::ContextData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one phase execution.
///
/// A result is mutable while the phase runs and frozen once
/// [`PhaseResult::complete`] has been called: later calls are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Name of the phase that produced this result.
    pub phase_name: String,
    /// When the attempt started.
    pub start_time: DateTime<Utc>,
    /// When the attempt finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Data to merge into the pipeline context on success.
    #[serde(default)]
    pub data: ContextData,
    /// Error messages, in the order they were recorded.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Non-fatal warnings.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Classification of the failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// 1-based attempt number that produced this result.
    #[serde(default = "first_attempt")]
    pub attempt: u32,
    /// Minimum wait requested by the phase before the next attempt.
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

fn first_attempt() -> u32 {
    1
}

impl PhaseResult {
    /// Starts a new, running result.
    #[must_use]
    pub fn new(phase_name: impl Into<String>) -> Self {
        Self {
            phase_name: phase_name.into(),
            start_time: Utc::now(),
            end_time: None,
            success: false,
            data: ContextData::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            attempt: first_attempt(),
            retry_after: None,
        }
    }

    /// Marks the result as complete.
    ///
    /// `data` replaces the current data only when it is non-empty.
    pub fn complete(&mut self, success: bool, data: Option<ContextData>) {
        if self.is_complete() {
            return;
        }
        self.end_time = Some(Utc::now());
        self.success = success;
        if let Some(data) = data.filter(|d| !d.is_empty()) {
            self.data = data;
        }
    }

    /// Records an error and completes the result as failed.
    pub fn fail(&mut self, kind: FailureKind, error: impl Into<String>) {
        self.errors.push(error.into());
        self.failure = Some(kind);
        self.complete(false, None);
    }

    /// Returns true once `complete` has been called.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }

    /// Returns true if a later attempt is worth making.
    ///
    /// Results without a recorded failure kind are treated as retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !self.success && self.failure.map_or(true, FailureKind::is_retryable)
    }

    /// Returns the execution duration in seconds.
    ///
    /// While the result is still running this is the time elapsed so far.
    #[must_use]
    pub fn duration(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time)
            .to_std()
            .map_or(0.0, |elapsed| elapsed.as_secs_f64())
    }

    /// Returns all errors joined into one summary line.
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.errors.join(", ")
    }

    /// Converts to a JSON summary.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        let mut data_keys: Vec<&String> = self.data.keys().collect();
        data_keys.sort();

        serde_json::json!({
            "phase_name": self.phase_name,
            "success": self.success,
            "duration": self.duration(),
            "errors": self.errors,
            "warnings": self.warnings,
            "data_keys": data_keys,
        })
    }
}
