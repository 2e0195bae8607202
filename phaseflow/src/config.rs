//! Orchestrator configuration.
//!
//! Everything the engine would otherwise read from ambient state (which
//! phases are critical, how long to back off, how to log) is passed in
//! explicitly through [`OrchestratorConfig`].

use crate::errors::PhaseflowError;
use crate::pipeline::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Configuration for a [`PipelineOrchestrator`](crate::pipeline::PipelineOrchestrator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Phases whose failure stops the run.
    #[serde(default = "default_critical_phases")]
    pub critical_phases: BTreeSet<String>,
    /// Whether `cleanup` also clears the shared context.
    #[serde(default)]
    pub clear_context_on_cleanup: bool,
    /// Context keys the caller promises to supply in the initial context.
    #[serde(default)]
    pub initial_keys: Vec<String>,
    /// Run pipeline-wide validation before the first phase.
    #[serde(default)]
    pub validate_before_run: bool,
    /// Backoff between retry attempts.
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// Logging setup used by [`init_tracing`](crate::observability::init_tracing).
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_critical_phases() -> BTreeSet<String> {
    BTreeSet::from(["fetch_data".to_string()])
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            critical_phases: default_critical_phases(),
            clear_context_on_cleanup: false,
            initial_keys: Vec::new(),
            validate_before_run: false,
            backoff: BackoffPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, PhaseflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PhaseflowError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PhaseflowError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Replaces the critical phase set.
    #[must_use]
    pub fn with_critical_phases(mut self, phases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.critical_phases = phases.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a critical phase.
    #[must_use]
    pub fn with_critical_phase(mut self, phase: impl Into<String>) -> Self {
        self.critical_phases.insert(phase.into());
        self
    }

    /// Sets whether cleanup clears the context.
    #[must_use]
    pub fn with_clear_context_on_cleanup(mut self, clear: bool) -> Self {
        self.clear_context_on_cleanup = clear;
        self
    }

    /// Sets the keys promised by the initial context.
    #[must_use]
    pub fn with_initial_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.initial_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether to validate the pipeline before running it.
    #[must_use]
    pub fn with_validate_before_run(mut self, validate: bool) -> Self {
        self.validate_before_run = validate;
        self
    }

    /// Sets the backoff policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Returns true if `phase` is critical.
    #[must_use]
    pub fn is_critical(&self, phase: &str) -> bool {
        self.critical_phases.contains(phase)
    }

    fn check(&self) -> Result<(), PhaseflowError> {
        if self.backoff.max_delay_ms < self.backoff.base_delay_ms {
            return Err(PhaseflowError::Config(format!(
                "backoff.max_delay_ms ({}) is smaller than backoff.base_delay_ms ({})",
                self.backoff.max_delay_ms, self.backoff.base_delay_ms
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(PhaseflowError::Config("logging.level cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `phaseflow=debug`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();

        assert!(config.is_critical("fetch_data"));
        assert!(!config.is_critical("render"));
        assert!(!config.clear_context_on_cleanup);
        assert_eq!(config.backoff, BackoffPolicy::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = OrchestratorConfig::from_json_str(
            r#"{
                "critical_phases": ["fetch_data", "enrich"],
                "clear_context_on_cleanup": true,
                "backoff": {"base_delay_ms": 5}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config,
            OrchestratorConfig::new()
                .with_critical_phases(["enrich", "fetch_data"])
                .with_clear_context_on_cleanup(true)
                .with_backoff(BackoffPolicy::new().with_base_delay_ms(5))
        );
    }

    #[test]
    fn test_from_json_rejects_bad_backoff() {
        let err = OrchestratorConfig::from_json_str(
            r#"{"backoff": {"base_delay_ms": 100, "max_delay_ms": 10}}"#,
        )
        .unwrap_err();

        assert!(matches!(err, PhaseflowError::Config(_)));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let err = OrchestratorConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, PhaseflowError::Serialization(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"initial_keys": ["org", "token"]}}"#).unwrap();

        let config = OrchestratorConfig::from_path(file.path()).unwrap();
        assert_eq!(config.initial_keys, vec!["org", "token"]);

        let missing = OrchestratorConfig::from_path("/definitely/not/here.json");
        assert!(matches!(missing, Err(PhaseflowError::Config(_))));
    }
}
