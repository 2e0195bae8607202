//! Test fixtures for pipeline testing.

use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::context::ContextData;
use crate::events::CollectingEventSink;
use crate::phases::{Phase, PhaseConfig};
use crate::pipeline::{BackoffPolicy, PipelineOrchestrator};

use super::SuccessPhase;

/// Builds context data from key/value pairs.
#[must_use]
pub fn context_data<K: Into<String>>(
    pairs: impl IntoIterator<Item = (K, serde_json::Value)>,
) -> ContextData {
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// A configuration suitable for tests: no backoff and no critical phases.
#[must_use]
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_critical_phases(Vec::<String>::new())
        .with_backoff(BackoffPolicy::immediate())
}

/// A test pipeline builder that wires in a collecting event sink.
pub struct TestPipeline {
    /// Orchestrator configuration.
    pub config: OrchestratorConfig,
    /// Phases in registration order.
    pub phases: Vec<Arc<dyn Phase>>,
    sink: Arc<CollectingEventSink>,
}

impl TestPipeline {
    /// Creates an empty test pipeline using [`fast_config`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: fast_config(),
            phases: Vec::new(),
            sink: Arc::new(CollectingEventSink::new()),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Marks a phase as critical.
    #[must_use]
    pub fn with_critical(mut self, phase: impl Into<String>) -> Self {
        self.config = self.config.with_critical_phase(phase);
        self
    }

    /// Adds a phase.
    #[must_use]
    pub fn with_phase(mut self, phase: Arc<dyn Phase>) -> Self {
        self.phases.push(phase);
        self
    }

    /// Creates a linear pipeline of succeeding phases named `phase_0..`.
    #[must_use]
    pub fn linear(count: usize) -> Self {
        (0..count).fold(Self::new(), |pipeline, i| {
            pipeline.with_phase(Arc::new(SuccessPhase::new(PhaseConfig::new(format!("phase_{i}")))))
        })
    }

    /// Returns the sink that will receive the orchestrator's events.
    #[must_use]
    pub fn events(&self) -> Arc<CollectingEventSink> {
        self.sink.clone()
    }

    /// Builds the orchestrator.
    #[must_use]
    pub fn build(&self) -> PipelineOrchestrator {
        let mut orchestrator =
            PipelineOrchestrator::new(self.config.clone()).with_event_sink(self.sink.clone());
        orchestrator.register_phases(self.phases.iter().cloned());
        orchestrator
    }
}

impl Default for TestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_data() {
        let data = context_data([("org", json!("acme")), ("limit", json!(10))]);

        assert_eq!(data.len(), 2);
        assert_eq!(data.get("org"), Some(&json!("acme")));
    }

    #[test]
    fn test_fast_config() {
        let config = fast_config();

        assert!(config.critical_phases.is_empty());
        assert_eq!(config.backoff.delay_for(5), std::time::Duration::ZERO);
    }

    #[test]
    fn test_linear_pipeline() {
        let pipeline = TestPipeline::linear(3).with_critical("phase_1");
        let orchestrator = pipeline.build();

        assert_eq!(orchestrator.phase_names(), vec!["phase_0", "phase_1", "phase_2"]);
        assert!(orchestrator.is_critical("phase_1"));
    }

    #[tokio::test]
    async fn test_events_are_collected() {
        let pipeline = TestPipeline::linear(1);
        let mut orchestrator = pipeline.build();

        orchestrator.execute_pipeline(None).await;

        assert_eq!(
            pipeline.events().event_types(),
            vec!["pipeline.started", "phase.started", "phase.completed", "pipeline.completed"]
        );
    }
}
