//! Pipeline execution.
//!
//! This module provides:
//! - The sequential [`PipelineOrchestrator`]
//! - Backoff policies between retry attempts
//! - The [`PipelineResult`] run report

mod orchestrator;
mod result;
mod retry;

pub use orchestrator::PipelineOrchestrator;
pub use result::{PipelineResult, PIPELINE_ERROR_KEY};
pub use retry::{BackoffPolicy, BackoffStrategy, JitterStrategy};
