//! Context management for pipeline execution.
//!
//! - `PipelineContext`: the shared mapping threaded through one run
//! - `Dependencies`: named services injected into individual phases

mod dependencies;
mod shared;

pub use dependencies::Dependencies;
pub use shared::{ContextData, PipelineContext};
