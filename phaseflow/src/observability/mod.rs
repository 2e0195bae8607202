//! Observability setup.
//!
//! Lifecycle facts are logged through `tracing` and emitted as
//! [`PipelineEvent`](crate::events::PipelineEvent)s. This module installs
//! the subscriber that renders the former.

mod logging;

pub use logging::{build_filter, init_tracing};
