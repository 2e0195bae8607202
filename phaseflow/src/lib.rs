//! # Phaseflow
//!
//! A sequential phase orchestration engine for multi-stage data and report
//! pipelines.
//!
//! Phaseflow runs named units of work ("phases") in registration order over
//! a shared context, with support for:
//!
//! - **Per-phase timeouts and retries** with configurable backoff
//! - **Failure isolation**: non-critical failures are recorded, not thrown
//! - **Critical phases** whose failure stops the run
//! - **Lifecycle events** alongside structured `tracing` logs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use phaseflow::prelude::*;
//!
//! let mut orchestrator = PipelineOrchestrator::new(OrchestratorConfig::default());
//! orchestrator.register_phases([
//!     Arc::new(FetchPhase::new(PhaseConfig::new("fetch_data"))) as Arc<dyn Phase>,
//!     Arc::new(AnalyzePhase::new(PhaseConfig::new("analyze").with_dependency("repos"))),
//! ]);
//!
//! let result = orchestrator.execute_pipeline(None).await;
//! result.write_build_log("build-log.json")?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod phases;
pub mod pipeline;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LoggingConfig, OrchestratorConfig};
    pub use crate::context::{ContextData, Dependencies, PipelineContext};
    pub use crate::core::{FailureKind, PhaseKind, PhaseResult};
    pub use crate::errors::{
        PhaseflowError, PipelineValidationError, PlatformError, PlatformErrorKind,
        ValidationIssue,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::observability::init_tracing;
    pub use crate::phases::{FnPhase, Phase, PhaseConfig, PhaseRunner};
    pub use crate::pipeline::{
        BackoffPolicy, BackoffStrategy, JitterStrategy, PipelineOrchestrator, PipelineResult,
        PIPELINE_ERROR_KEY,
    };
    pub use std::sync::Arc;
}
