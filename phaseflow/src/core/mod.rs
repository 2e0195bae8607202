//! Core value types for phaseflow.
//!
//! - Phase kind and failure classification enums
//! - The per-phase execution result

mod result;
mod status;

pub use result::PhaseResult;
pub use status::{FailureKind, PhaseKind};
