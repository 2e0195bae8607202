//! Mock phases for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::context::{ContextData, Dependencies, PipelineContext};
use crate::errors::PlatformError;
use crate::phases::{Phase, PhaseConfig};

/// Shared log of phase names in the order they executed.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

/// A phase that always succeeds with fixed data.
#[derive(Debug)]
pub struct SuccessPhase {
    config: PhaseConfig,
    data: ContextData,
    warnings: Vec<String>,
    call_count: Mutex<usize>,
}

impl SuccessPhase {
    /// Creates a success phase that returns no data.
    #[must_use]
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            data: ContextData::new(),
            warnings: Vec::new(),
            call_count: Mutex::new(0),
        }
    }

    /// Adds a key to the returned data.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Adds a warning to every successful result.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Phase for SuccessPhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, _ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        *self.call_count.lock() += 1;
        Ok(self.data.clone())
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }

    fn warnings(&self, _ctx: &PipelineContext, _data: &ContextData) -> Vec<String> {
        self.warnings.clone()
    }
}

/// A phase whose `execute` always fails.
#[derive(Debug)]
pub struct FailingPhase {
    config: PhaseConfig,
    error: String,
    validation: bool,
    call_count: Mutex<usize>,
}

impl FailingPhase {
    /// Creates a phase failing with a plain (retryable) error.
    #[must_use]
    pub fn new(config: PhaseConfig, error: impl Into<String>) -> Self {
        Self {
            config,
            error: error.into(),
            validation: false,
            call_count: Mutex::new(0),
        }
    }

    /// Creates a phase failing with a validation-class [`PlatformError`].
    #[must_use]
    pub fn validation(config: PhaseConfig, error: impl Into<String>) -> Self {
        Self {
            validation: true,
            ..Self::new(config, error)
        }
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Phase for FailingPhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, _ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        *self.call_count.lock() += 1;
        if self.validation {
            Err(PlatformError::validation(self.error.clone()).into())
        } else {
            Err(anyhow::anyhow!("{}", self.error))
        }
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }
}

/// A phase that fails a fixed number of times, then succeeds.
#[derive(Debug)]
pub struct FlakyPhase {
    config: PhaseConfig,
    failures: usize,
    data: ContextData,
    call_count: Mutex<usize>,
}

impl FlakyPhase {
    /// Creates a phase that fails its first `failures` calls.
    #[must_use]
    pub fn new(config: PhaseConfig, failures: usize) -> Self {
        Self {
            config,
            failures,
            data: ContextData::new(),
            call_count: Mutex::new(0),
        }
    }

    /// Adds a key to the data returned once the phase succeeds.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Phase for FlakyPhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, _ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        let call = {
            let mut count = self.call_count.lock();
            *count += 1;
            *count
        };

        if call <= self.failures {
            anyhow::bail!("transient failure on call {call}");
        }

        let mut data = self.data.clone();
        data.insert("succeeded_on_call".to_string(), serde_json::json!(call));
        Ok(data)
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }
}

/// A phase that sleeps before succeeding.
#[derive(Debug)]
pub struct SlowPhase {
    config: PhaseConfig,
    delay: Duration,
    call_count: Mutex<usize>,
}

impl SlowPhase {
    /// Creates a phase that sleeps for `delay` on every call.
    #[must_use]
    pub fn new(config: PhaseConfig, delay: Duration) -> Self {
        Self {
            config,
            delay,
            call_count: Mutex::new(0),
        }
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Phase for SlowPhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, _ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        *self.call_count.lock() += 1;
        tokio::time::sleep(self.delay).await;
        Ok(ContextData::new())
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }
}

/// A phase that records the context it saw and appends to a shared log.
#[derive(Debug)]
pub struct RecordingPhase {
    config: PhaseConfig,
    data: ContextData,
    log: Option<ExecutionLog>,
    seen: Mutex<Vec<ContextData>>,
}

impl RecordingPhase {
    /// Creates a recording phase.
    #[must_use]
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            data: ContextData::new(),
            log: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Appends the phase name to `log` on every call.
    #[must_use]
    pub fn with_log(mut self, log: ExecutionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Adds a key to the returned data.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a copy of the context seen by each call.
    #[must_use]
    pub fn seen_contexts(&self) -> Vec<ContextData> {
        self.seen.lock().clone()
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl Phase for RecordingPhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        self.seen.lock().push(ctx.as_data().clone());
        if let Some(log) = &self.log {
            log.lock().push(self.config.name.clone());
        }
        Ok(self.data.clone())
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }
}

/// A phase that reads an injected `String` service and outputs it.
///
/// The value is written under the service name.
#[derive(Debug)]
pub struct ServicePhase {
    config: PhaseConfig,
    service: String,
    dependencies: Dependencies,
    call_count: Mutex<usize>,
}

impl ServicePhase {
    /// Creates a phase that looks up `service` on every call.
    #[must_use]
    pub fn new(config: PhaseConfig, service: impl Into<String>) -> Self {
        let dependencies = Dependencies::new(config.name.clone());
        Self {
            config,
            service: service.into(),
            dependencies,
            call_count: Mutex::new(0),
        }
    }

    /// Injects a service before registration.
    #[must_use]
    pub fn with_service(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dependencies.inject(name, value.into());
        self
    }

    /// Returns the injected services.
    #[must_use]
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Phase for ServicePhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, _ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        *self.call_count.lock() += 1;
        let value = self.dependencies.get::<String>(&self.service)?;

        let mut data = ContextData::new();
        data.insert(self.service.clone(), serde_json::json!(value.as_str()));
        Ok(data)
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }
}

/// A phase whose `validate_input` always returns false.
#[derive(Debug)]
pub struct RejectingPhase {
    config: PhaseConfig,
    validations: Mutex<usize>,
    call_count: Mutex<usize>,
}

impl RejectingPhase {
    /// Creates a rejecting phase.
    #[must_use]
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            validations: Mutex::new(0),
            call_count: Mutex::new(0),
        }
    }

    /// Returns the number of `validate_input` calls.
    #[must_use]
    pub fn validation_count(&self) -> usize {
        *self.validations.lock()
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Phase for RejectingPhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, _ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        *self.call_count.lock() += 1;
        Ok(ContextData::new())
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        *self.validations.lock() += 1;
        false
    }
}

/// A phase that panics when executed.
#[derive(Debug)]
pub struct PanickingPhase {
    config: PhaseConfig,
    message: String,
    call_count: Mutex<usize>,
}

impl PanickingPhase {
    /// Creates a phase that panics with `message`.
    #[must_use]
    pub fn new(config: PhaseConfig, message: impl Into<String>) -> Self {
        Self {
            config,
            message: message.into(),
            call_count: Mutex::new(0),
        }
    }

    /// Returns the number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Phase for PanickingPhase {
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, _ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        *self.call_count.lock() += 1;
        panic!("{}", self.message);
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_success_phase() {
        let phase = SuccessPhase::new(PhaseConfig::new("ok"))
            .with_value("key", json!("value"))
            .with_warning("heads up");
        let ctx = PipelineContext::new();

        let data = phase.execute(&ctx).await.unwrap();

        assert_eq!(data.get("key"), Some(&json!("value")));
        assert_eq!(phase.warnings(&ctx, &data), vec!["heads up".to_string()]);
        assert_eq!(phase.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_phase() {
        let plain = FailingPhase::new(PhaseConfig::new("fail"), "boom");
        let err = plain.execute(&PipelineContext::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let validation = FailingPhase::validation(PhaseConfig::new("fail"), "bad input");
        let err = validation.execute(&PipelineContext::new()).await.unwrap_err();
        assert!(err.downcast_ref::<PlatformError>().is_some_and(PlatformError::is_validation));
        assert_eq!(validation.call_count(), 1);
    }

    #[tokio::test]
    async fn test_flaky_phase() {
        let phase = FlakyPhase::new(PhaseConfig::new("flaky"), 2);
        let ctx = PipelineContext::new();

        assert!(phase.execute(&ctx).await.is_err());
        assert!(phase.execute(&ctx).await.is_err());
        let data = phase.execute(&ctx).await.unwrap();

        assert_eq!(data.get("succeeded_on_call"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_slow_phase() {
        let phase = SlowPhase::new(PhaseConfig::new("slow"), Duration::from_millis(10));

        let start = std::time::Instant::now();
        phase.execute(&PipelineContext::new()).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(phase.call_count(), 1);
    }

    #[tokio::test]
    async fn test_recording_phase() {
        let log = ExecutionLog::default();
        let phase = RecordingPhase::new(PhaseConfig::new("record")).with_log(log.clone());
        let mut ctx = PipelineContext::new();
        ctx.insert("x", json!(1));

        phase.execute(&ctx).await.unwrap();
        phase.execute(&ctx).await.unwrap();

        assert_eq!(phase.call_count(), 2);
        assert_eq!(phase.seen_contexts()[0].get("x"), Some(&json!(1)));
        assert_eq!(*log.lock(), vec!["record".to_string(), "record".to_string()]);
    }

    #[tokio::test]
    async fn test_service_phase() {
        let phase = ServicePhase::new(PhaseConfig::new("fetch_data"), "api_base")
            .with_service("api_base", "https://api.github.com");

        let data = phase.execute(&PipelineContext::new()).await.unwrap();

        assert_eq!(data.get("api_base"), Some(&json!("https://api.github.com")));
        assert_eq!(phase.dependencies().names(), vec!["api_base"]);

        let bare = ServicePhase::new(PhaseConfig::new("fetch_data"), "api_base");
        assert!(bare.execute(&PipelineContext::new()).await.is_err());
        assert_eq!(bare.call_count(), 1);
    }

    #[test]
    fn test_rejecting_phase() {
        let phase = RejectingPhase::new(PhaseConfig::new("reject"));

        assert!(!phase.validate_input(&PipelineContext::new()));
        assert_eq!(phase.validation_count(), 1);
        assert_eq!(phase.call_count(), 0);
    }
}
