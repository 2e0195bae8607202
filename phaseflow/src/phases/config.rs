//! Phase configuration.

use crate::core::PhaseKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable configuration for a single phase.
///
/// Built once with the `with_*` methods and then owned by the phase. The
/// orchestrator only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Unique phase name.
    pub name: String,
    /// Disabled phases are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Wall-clock budget for a single attempt.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
    /// Maximum attempts, including the first.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Context keys that must exist before the phase runs.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Context keys the phase declares it produces.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// What kind of work the phase does.
    #[serde(default)]
    pub kind: PhaseKind,
    /// How long the phase's output stays fresh. Informational only.
    #[serde(default, with = "option_duration_secs")]
    pub cache_ttl: Option<Duration>,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_retry_count() -> u32 {
    3
}

impl PhaseConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: default_enabled(),
            timeout: default_timeout(),
            retry_count: default_retry_count(),
            dependencies: Vec::new(),
            outputs: Vec::new(),
            kind: PhaseKind::default(),
            cache_ttl: None,
        }
    }

    /// Enables or disables the phase.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Disables the phase.
    #[must_use]
    pub fn disabled(self) -> Self {
        self.with_enabled(false)
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of attempts. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count.max(1);
        self
    }

    /// Sets the required context keys.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a required context key.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Sets the declared output keys.
    #[must_use]
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the phase kind.
    #[must_use]
    pub fn with_kind(mut self, kind: PhaseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Returns the number of attempts the orchestrator will make.
    ///
    /// Deserialized configs may carry a zero; it still means one attempt.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retry_count.max(1)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod option_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PhaseConfig::new("fetch_data");

        assert!(config.enabled);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.retry_count, 3);
        assert!(config.dependencies.is_empty());
        assert_eq!(config.kind, PhaseKind::Utility);
        assert_eq!(config.cache_ttl, None);
    }

    #[test]
    fn test_builder() {
        let config = PhaseConfig::new("analyze")
            .with_timeout(Duration::from_millis(1500))
            .with_retry_count(5)
            .with_dependencies(["repos", "contributors"])
            .with_outputs(["health_scores"])
            .with_kind(PhaseKind::Analysis)
            .disabled();

        assert!(!config.enabled);
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.dependencies, vec!["repos", "contributors"]);
        assert_eq!(config.outputs, vec!["health_scores"]);
        assert_eq!(config.kind, PhaseKind::Analysis);
    }

    #[test]
    fn test_retry_count_clamped() {
        assert_eq!(PhaseConfig::new("p").with_retry_count(0).retry_count, 1);

        let mut config = PhaseConfig::new("p");
        config.retry_count = 0;
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn test_serializes_durations_as_seconds() {
        let config = PhaseConfig::new("render")
            .with_timeout(Duration::from_millis(2500))
            .with_cache_ttl(Duration::from_secs(3600));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 2.5);
        assert_eq!(json["cache_ttl"], 3600.0);
        assert_eq!(json["kind"], "utility");

        let back: PhaseConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: PhaseConfig =
            serde_json::from_str(r#"{"name": "fetch_data", "dependencies": ["org"]}"#).unwrap();

        assert_eq!(config, PhaseConfig::new("fetch_data").with_dependency("org"));
    }
}
