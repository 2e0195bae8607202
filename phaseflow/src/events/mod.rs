//! Lifecycle events emitted by the orchestrator.
//!
//! Events complement `tracing` output: they carry the same lifecycle facts
//! as typed values, so callers can persist or assert on them.

mod event;
mod sink;

pub use event::PipelineEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
