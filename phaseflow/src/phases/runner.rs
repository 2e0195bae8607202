//! The per-attempt template around a phase.

use super::{Phase, PhaseConfig};
use crate::context::PipelineContext;
use crate::core::{FailureKind, PhaseResult};
use crate::errors::{PhaseflowError, PlatformError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Wraps a registered phase and runs single attempts of it.
///
/// `run` is the only way the orchestrator executes a phase. It checks
/// dependency keys, validates input, enforces the timeout and turns every
/// outcome into a [`PhaseResult`]. It never writes to the context.
#[derive(Debug)]
pub struct PhaseRunner {
    phase: Arc<dyn Phase>,
    last_result: Mutex<Option<PhaseResult>>,
}

impl PhaseRunner {
    /// Creates a runner for a phase.
    #[must_use]
    pub fn new(phase: Arc<dyn Phase>) -> Self {
        Self {
            phase,
            last_result: Mutex::new(None),
        }
    }

    /// Returns the wrapped phase.
    #[must_use]
    pub fn phase(&self) -> &Arc<dyn Phase> {
        &self.phase
    }

    /// Returns the phase configuration.
    #[must_use]
    pub fn config(&self) -> &PhaseConfig {
        self.phase.config()
    }

    /// Returns the phase name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.phase.config().name
    }

    /// Returns true if every configured dependency key is in the context.
    pub fn validate_dependencies(&self, ctx: &PipelineContext) -> bool {
        let missing = ctx.missing_keys(&self.config().dependencies);
        for key in &missing {
            error!(phase = %self.name(), dependency = %key, "Missing required dependency");
        }
        missing.is_empty()
    }

    /// Runs one attempt of the phase.
    pub async fn run(&self, ctx: &PipelineContext) -> PhaseResult {
        self.run_attempt(ctx, 1).await
    }

    /// Runs the 1-based attempt `attempt` of the phase.
    pub async fn run_attempt(&self, ctx: &PipelineContext, attempt: u32) -> PhaseResult {
        let result = self.attempt(ctx, attempt).await;
        self.record(result.clone());
        result
    }

    async fn attempt(&self, ctx: &PipelineContext, attempt: u32) -> PhaseResult {
        let config = self.config();
        let mut result = PhaseResult::new(&config.name);
        result.attempt = attempt;

        if !self.validate_dependencies(ctx) {
            let missing = ctx.missing_keys(&config.dependencies);
            result.fail(
                FailureKind::Dependency,
                format!("Missing required dependencies: {}", missing.join(", ")),
            );
            return result;
        }

        if !self.phase.validate_input(ctx) {
            warn!(phase = %config.name, "Input validation failed");
            result.fail(FailureKind::Validation, "Input validation failed");
            return result;
        }

        info!(phase = %config.name, kind = %config.kind, attempt, "Starting phase");

        match timeout(config.timeout, self.phase.execute(ctx)).await {
            Ok(Ok(data)) => {
                let warnings = self.phase.warnings(ctx, &data);
                result.warnings.extend(warnings);
                result.complete(true, Some(data));
                info!(
                    phase = %config.name,
                    duration_s = result.duration(),
                    "Phase completed successfully"
                );
            }
            Ok(Err(err)) => {
                let platform = err.chain().find_map(|cause| cause.downcast_ref::<PlatformError>());
                let kind = classify(&err, platform);
                result.retry_after = platform.and_then(|p| p.retry_after);

                let message = format!("Phase {} failed: {err:#}", config.name);
                error!(phase = %config.name, failure = %kind, error = %message, "Phase execution error");
                result.fail(kind, message);
            }
            Err(_elapsed) => {
                let message = format!(
                    "Phase {} timed out after {}s",
                    config.name,
                    config.timeout.as_secs_f64()
                );
                error!(phase = %config.name, timeout_s = config.timeout.as_secs_f64(), "{message}");
                result.fail(FailureKind::Timeout, message);
            }
        }

        result
    }

    /// Stores `result` as the phase's most recent result.
    pub(crate) fn record(&self, result: PhaseResult) {
        *self.last_result.lock() = Some(result);
    }

    /// Returns the result of the most recent attempt.
    #[must_use]
    pub fn last_result(&self) -> Option<PhaseResult> {
        self.last_result.lock().clone()
    }

    /// Forgets the most recent result.
    pub fn clear_last_result(&self) {
        self.last_result.lock().take();
    }
}

/// Maps an `execute` error onto a failure kind.
///
/// Missing injected services and validation-class domain errors map to
/// non-retryable kinds.
fn classify(err: &anyhow::Error, platform: Option<&PlatformError>) -> FailureKind {
    let not_injected = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<PhaseflowError>(),
            Some(PhaseflowError::DependencyNotInjected { .. })
        )
    });

    if not_injected {
        FailureKind::Dependency
    } else if platform.is_some_and(PlatformError::is_validation) {
        FailureKind::Validation
    } else {
        FailureKind::Execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextData;
    use crate::phases::FnPhase;
    use serde_json::json;
    use std::time::Duration;

    fn runner<F>(config: PhaseConfig, func: F) -> PhaseRunner
    where
        F: Fn(&PipelineContext) -> anyhow::Result<ContextData> + Send + Sync + 'static,
    {
        PhaseRunner::new(Arc::new(FnPhase::new(config, func)))
    }

    fn produce(key: &str, value: serde_json::Value) -> ContextData {
        let mut data = ContextData::new();
        data.insert(key.to_string(), value);
        data
    }

    #[tokio::test]
    async fn test_run_success() {
        let runner = runner(PhaseConfig::new("fetch_data"), |_| Ok(produce("repos", json!(3))));

        let result = runner.run(&PipelineContext::new()).await;

        assert!(result.success);
        assert_eq!(result.data.get("repos"), Some(&json!(3)));
        assert!(result.is_complete());
        assert!(runner.last_result().is_some_and(|r| r.success));
    }

    #[tokio::test]
    async fn test_missing_dependencies() {
        let runner = runner(
            PhaseConfig::new("analyze").with_dependencies(["repos", "org"]),
            |_| Ok(ContextData::new()),
        );
        let mut ctx = PipelineContext::new();
        ctx.insert("org", json!("acme"));

        let result = runner.run(&ctx).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Dependency));
        assert_eq!(result.errors, vec!["Missing required dependencies: repos".to_string()]);
    }

    #[tokio::test]
    async fn test_input_validation_failure() {
        let phase = FnPhase::new(PhaseConfig::new("render"), |_| Ok(ContextData::new()))
            .with_validator(|_| false);
        let runner = PhaseRunner::new(Arc::new(phase));

        let result = runner.run(&PipelineContext::new()).await;

        assert_eq!(result.failure, Some(FailureKind::Validation));
        assert_eq!(result.errors, vec!["Input validation failed".to_string()]);
    }

    #[tokio::test]
    async fn test_execution_error_message() {
        let runner = runner(PhaseConfig::new("fetch_data"), |_| {
            Err(anyhow::anyhow!("connection reset"))
        });

        let result = runner.run(&PipelineContext::new()).await;

        assert_eq!(result.failure, Some(FailureKind::Execution));
        assert_eq!(result.errors, vec!["Phase fetch_data failed: connection reset".to_string()]);
        assert!(result.data.is_empty());
    }

    #[tokio::test]
    async fn test_platform_validation_error_not_retryable() {
        let runner = runner(PhaseConfig::new("parse"), |_| {
            Err(anyhow::Error::new(PlatformError::validation("malformed metadata"))
                .context("parsing citations"))
        });

        let result = runner.run(&PipelineContext::new()).await;

        assert_eq!(result.failure, Some(FailureKind::Validation));
        assert!(!result.is_retryable());
        assert!(result.errors[0].contains("parsing citations: malformed metadata"));
    }

    #[tokio::test]
    async fn test_uninjected_service_is_dependency_failure() {
        let deps = crate::context::Dependencies::new("fetch_data");
        let runner = runner(PhaseConfig::new("fetch_data"), move |_| {
            let token = deps.get::<String>("github_token")?;
            Ok(produce("token_len", json!(token.len())))
        });

        let result = runner.run(&PipelineContext::new()).await;

        assert_eq!(result.failure, Some(FailureKind::Dependency));
        assert!(!result.is_retryable());
        assert_eq!(
            result.errors,
            vec!["Phase fetch_data failed: Dependency 'github_token' not found in fetch_data".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let runner = runner(PhaseConfig::new("fetch_data"), |_| {
            Err(PlatformError::rate_limit("quota exhausted", Some(Duration::from_millis(5))).into())
        });

        let result = runner.run(&PipelineContext::new()).await;

        assert_eq!(result.failure, Some(FailureKind::Execution));
        assert_eq!(result.retry_after, Some(Duration::from_millis(5)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = PhaseRunner::new(Arc::new(crate::testing::SlowPhase::new(
            PhaseConfig::new("slow_phase").with_timeout(Duration::from_millis(20)),
            Duration::from_secs(10),
        )));

        let result = runner.run(&PipelineContext::new()).await;

        assert_eq!(result.failure, Some(FailureKind::Timeout));
        assert_eq!(result.errors, vec!["Phase slow_phase timed out after 0.02s".to_string()]);
    }

    #[tokio::test]
    async fn test_run_attempt_numbers_result() {
        let runner = runner(PhaseConfig::new("p"), |_| Err(anyhow::anyhow!("nope")));

        let result = runner.run_attempt(&PipelineContext::new(), 3).await;

        assert_eq!(result.attempt, 3);
        assert_eq!(runner.last_result().map(|r| r.attempt), Some(3));
    }

    #[tokio::test]
    async fn test_clear_last_result() {
        let runner = runner(PhaseConfig::new("p"), |_| Ok(ContextData::new()));
        runner.run(&PipelineContext::new()).await;

        runner.clear_last_result();

        assert!(runner.last_result().is_none());
    }
}
