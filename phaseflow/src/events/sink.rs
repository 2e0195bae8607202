//! Event sink trait and implementations.

use super::PipelineEvent;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Receives pipeline lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: &PipelineEvent);

    /// Emits an event without awaiting.
    ///
    /// Implementations must not fail; problems are logged and swallowed.
    fn try_emit(&self, event: &PipelineEvent);
}

/// A sink that discards all events. Used when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &PipelineEvent) {}

    fn try_emit(&self, _event: &PipelineEvent) {}
}

/// A sink that writes events to `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level.
    ///
    /// Levels other than `DEBUG` log at `INFO`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &PipelineEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        if self.level == Level::DEBUG {
            debug!(event_type = event.event_type(), phase = ?event.phase(), %payload, "Pipeline event");
        } else {
            info!(event_type = event.event_type(), phase = ?event.phase(), %payload, "Pipeline event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &PipelineEvent) {
        self.log_event(event);
    }

    fn try_emit(&self, event: &PipelineEvent) {
        self.log_event(event);
    }
}

/// A sink that keeps every event in memory, for tests and build logs.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the dotted types of all collected events, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(PipelineEvent::event_type).collect()
    }

    /// Returns the events concerning one phase.
    #[must_use]
    pub fn events_for_phase(&self, phase: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.phase() == Some(phase))
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }

    fn try_emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}
