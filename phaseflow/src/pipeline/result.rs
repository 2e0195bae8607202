//! Pipeline run report.

use crate::context::ContextData;
use crate::errors::PhaseflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// Error key used for failures that are not attributable to one phase.
pub const PIPELINE_ERROR_KEY: &str = "pipeline";

/// Final report of one `execute_pipeline` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run identifier.
    pub run_id: Uuid,
    /// True iff no phase failed and no pipeline-level error occurred.
    pub success: bool,
    /// Phases that succeeded, in execution order.
    pub phases_completed: Vec<String>,
    /// Phases that failed, in execution order.
    pub phases_failed: Vec<String>,
    /// Error summary per failed phase (plus [`PIPELINE_ERROR_KEY`]).
    pub errors: BTreeMap<String, String>,
    /// Warnings per completed phase.
    pub warnings: BTreeMap<String, Vec<String>>,
    /// The shared context after the run.
    pub data: ContextData,
    /// Run duration in seconds.
    pub duration: f64,
    /// When the report was created.
    pub timestamp: DateTime<Utc>,
}

impl PipelineResult {
    /// Builds a report. `success` is derived from the failure lists.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        phases_completed: Vec<String>,
        phases_failed: Vec<String>,
        errors: BTreeMap<String, String>,
        warnings: BTreeMap<String, Vec<String>>,
        data: ContextData,
        duration: f64,
    ) -> Self {
        Self {
            run_id,
            success: phases_failed.is_empty() && errors.is_empty(),
            phases_completed,
            phases_failed,
            errors,
            warnings,
            data,
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Returns the number of phases that ran to a final outcome.
    #[must_use]
    pub fn total_phases(&self) -> usize {
        self.phases_completed.len() + self.phases_failed.len()
    }

    /// Returns the error summary for a phase.
    #[must_use]
    pub fn error_for(&self, phase: &str) -> Option<&str> {
        self.errors.get(phase).map(String::as_str)
    }

    /// Returns the pipeline-level error, if one occurred.
    #[must_use]
    pub fn pipeline_error(&self) -> Option<&str> {
        self.error_for(PIPELINE_ERROR_KEY)
    }

    /// Converts to a JSON summary without the context data.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id,
            "success": self.success,
            "phases_completed": self.phases_completed,
            "phases_failed": self.phases_failed,
            "errors": self.errors,
            "warnings": self.warnings,
            "duration": self.duration,
            "timestamp": self.timestamp.to_rfc3339(),
            "summary": {
                "total_phases": self.total_phases(),
                "successful": self.phases_completed.len(),
                "failed": self.phases_failed.len(),
            },
        })
    }

    /// Writes the summary to `path` as pretty-printed JSON.
    pub fn write_build_log(&self, path: impl AsRef<Path>) -> Result<(), PhaseflowError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &self.to_dict())?;
        writer.flush()?;
        Ok(())
    }
}
