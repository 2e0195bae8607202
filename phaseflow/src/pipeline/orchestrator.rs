//! Sequential pipeline execution with retry and critical-phase handling.

use super::{PipelineResult, PIPELINE_ERROR_KEY};
use crate::config::OrchestratorConfig;
use crate::context::{ContextData, PipelineContext};
use crate::core::{FailureKind, PhaseResult};
use crate::errors::{PhaseflowError, PipelineValidationError, ValidationIssue};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::phases::{Phase, PhaseConfig, PhaseRunner};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Accumulates the outcome of one run while phases execute.
#[derive(Debug, Default)]
struct RunOutcome {
    completed: Vec<String>,
    failed: Vec<String>,
    errors: BTreeMap<String, String>,
    warnings: BTreeMap<String, Vec<String>>,
}

/// Runs registered phases in registration order over a shared context.
///
/// Phases never run concurrently. Each enabled phase is retried according
/// to its [`PhaseConfig`]; successful output is merged into the context,
/// failures are recorded, and a failing critical phase ends the run.
pub struct PipelineOrchestrator {
    config: OrchestratorConfig,
    phases: Vec<PhaseRunner>,
    context: PipelineContext,
    phase_results: HashMap<String, PhaseResult>,
    event_sink: Arc<dyn EventSink>,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .field("phases", &self.phase_names())
            .field("context_keys", &self.context.keys())
            .finish_non_exhaustive()
    }
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with no phases.
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            phases: Vec::new(),
            context: PipelineContext::new(),
            phase_results: HashMap::new(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink that receives lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Appends a phase. Registration order is execution order.
    pub fn register_phase(&mut self, phase: Arc<dyn Phase>) {
        info!(phase = %phase.name(), kind = %phase.config().kind, "Registered phase");
        self.phases.push(PhaseRunner::new(phase));
    }

    /// Appends several phases in order.
    pub fn register_phases(&mut self, phases: impl IntoIterator<Item = Arc<dyn Phase>>) {
        for phase in phases {
            self.register_phase(phase);
        }
    }

    /// Returns the number of registered phases.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Returns the registered phase names in order.
    #[must_use]
    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(PhaseRunner::name).collect()
    }

    /// Runs every enabled phase and reports the outcome.
    ///
    /// Phase failures never surface as errors here: they are recorded in
    /// the returned [`PipelineResult`]. Problems outside any single phase
    /// (failed pre-run validation, a panic in the loop) are recorded under
    /// [`PIPELINE_ERROR_KEY`] and the partial result is still returned.
    pub async fn execute_pipeline(&mut self, initial_context: Option<ContextData>) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let start = Instant::now();

        self.context = PipelineContext::from_data(initial_context.unwrap_or_default());
        self.phase_results.clear();

        info!(%run_id, phases = self.phases.len(), "Starting pipeline execution");
        self.event_sink
            .emit(&PipelineEvent::PipelineStarted {
                run_id,
                phases: self.phases.len(),
            })
            .await;

        let mut outcome = RunOutcome::default();
        let run = AssertUnwindSafe(self.run_phases(&mut outcome))
            .catch_unwind()
            .await;

        match run {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(%run_id, error = %err, "Pipeline execution failed");
                outcome.errors.insert(PIPELINE_ERROR_KEY.to_string(), err.to_string());
            }
            Err(panic) => {
                let message = format!("Pipeline panicked: {}", panic_message(panic.as_ref()));
                error!(%run_id, error = %message, "Pipeline execution failed");
                outcome.errors.insert(PIPELINE_ERROR_KEY.to_string(), message);
            }
        }

        let result = PipelineResult::new(
            run_id,
            outcome.completed,
            outcome.failed,
            outcome.errors,
            outcome.warnings,
            self.context.as_data().clone(),
            start.elapsed().as_secs_f64(),
        );

        info!(
            %run_id,
            success = result.success,
            completed = result.phases_completed.len(),
            failed = result.phases_failed.len(),
            duration_s = result.duration,
            "Pipeline execution finished"
        );
        self.event_sink
            .emit(&PipelineEvent::PipelineCompleted {
                run_id,
                success: result.success,
                completed: result.phases_completed.len(),
                failed: result.phases_failed.len(),
                duration_ms: result.duration * 1000.0,
            })
            .await;

        result
    }

    async fn run_phases(&mut self, outcome: &mut RunOutcome) -> Result<(), PhaseflowError> {
        if self.config.validate_before_run {
            self.validate()?;
        }

        for runner in &self.phases {
            let name = runner.name().to_string();
            let config = runner.config();

            if !config.enabled {
                info!(phase = %name, "Skipping disabled phase");
                self.event_sink
                    .try_emit(&PipelineEvent::PhaseSkipped { phase: name });
                continue;
            }

            self.event_sink.try_emit(&PipelineEvent::PhaseStarted {
                phase: name.clone(),
                kind: config.kind,
            });

            let span = info_span!("phase", phase = %name, kind = %config.kind);
            let result = self
                .execute_phase_with_retry(runner, &self.context)
                .instrument(span)
                .await;

            if result.success {
                self.event_sink.try_emit(&PipelineEvent::PhaseCompleted {
                    phase: name.clone(),
                    attempt: result.attempt,
                    duration_ms: result.duration() * 1000.0,
                });
                self.context.merge(result.data.clone());
                if !result.warnings.is_empty() {
                    outcome.warnings.insert(name.clone(), result.warnings.clone());
                }
                outcome.completed.push(name.clone());
                self.phase_results.insert(name, result);
                continue;
            }

            let critical = self.config.is_critical(&name);
            let summary = result.error_summary();
            self.event_sink.try_emit(&PipelineEvent::PhaseFailed {
                phase: name.clone(),
                attempt: result.attempt,
                failure: result.failure,
                error: summary.clone(),
                critical,
            });
            outcome.failed.push(name.clone());
            outcome.errors.insert(name.clone(), summary);
            self.phase_results.insert(name.clone(), result);

            if critical {
                error!(phase = %name, "Critical phase failed, stopping pipeline");
                break;
            }
        }

        Ok(())
    }

    async fn execute_phase_with_retry(
        &self,
        runner: &PhaseRunner,
        ctx: &PipelineContext,
    ) -> PhaseResult {
        let attempts = runner.config().attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut result = match AssertUnwindSafe(runner.run_attempt(ctx, attempt))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => {
                    let message = format!(
                        "Phase {} panicked: {}",
                        runner.name(),
                        panic_message(panic.as_ref())
                    );
                    error!(attempt, error = %message, "Phase panicked");
                    let mut result = PhaseResult::new(runner.name());
                    result.attempt = attempt;
                    result.fail(FailureKind::Panic, message);
                    runner.record(result.clone());
                    return result;
                }
            };

            if result.success {
                return result;
            }
            if !result.is_retryable() {
                warn!(attempt, failure = ?result.failure, "Phase failure is not retryable");
                return result;
            }
            if attempt >= attempts {
                error!(attempts, "Phase failed after all attempts");
                return result;
            }

            let backoff = self.config.backoff.delay_for(attempt - 1);
            let delay = result.retry_after.take().map_or(backoff, |after| after.max(backoff));
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            let summary = result.error_summary();
            warn!(
                attempt,
                delay_ms,
                error = %summary,
                "Phase attempt failed, retrying"
            );
            self.event_sink.try_emit(&PipelineEvent::PhaseRetrying {
                phase: runner.name().to_string(),
                attempt,
                delay_ms,
                error: summary,
            });

            tokio::time::sleep(delay).await;
        }
    }

    /// Returns true if a failure of `phase` stops the run.
    #[must_use]
    pub fn is_critical(&self, phase: &str) -> bool {
        self.config.is_critical(phase)
    }

    /// Returns the final result of a phase from the last run.
    #[must_use]
    pub fn get_phase_result(&self, name: &str) -> Option<&PhaseResult> {
        self.phase_results.get(name)
    }

    /// Returns a value from the context of the last run.
    #[must_use]
    pub fn get_context_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.get(key)
    }

    /// Returns the context of the last run.
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Checks every declared dependency against the pipeline.
    ///
    /// A dependency resolves if it names a registered phase, an output
    /// declared by an earlier phase, or one of the configured initial keys.
    /// Duplicate phase names are reported too.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        let phase_names: HashSet<&str> = self.phases.iter().map(PhaseRunner::name).collect();
        let mut available: HashSet<&str> =
            self.config.initial_keys.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut issues = Vec::new();

        for runner in &self.phases {
            let config = runner.config();
            if !seen.insert(config.name.as_str()) {
                issues.push(ValidationIssue::DuplicatePhase {
                    phase: config.name.clone(),
                });
            }
            for dependency in &config.dependencies {
                let resolved = phase_names.contains(dependency.as_str())
                    || available.contains(dependency.as_str());
                if !resolved {
                    issues.push(ValidationIssue::UnknownDependency {
                        phase: config.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
            available.extend(config.outputs.iter().map(String::as_str));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(PipelineValidationError::new(issues))
        }
    }

    /// Returns false and logs each problem if the pipeline does not validate.
    pub fn validate_pipeline_config(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(err) => {
                for issue in &err.issues {
                    error!(%issue, "Pipeline configuration issue");
                }
                false
            }
        }
    }

    /// Returns the registered phase configurations in execution order.
    #[must_use]
    pub fn get_execution_plan(&self) -> Vec<PhaseConfig> {
        self.phases.iter().map(|runner| runner.config().clone()).collect()
    }

    /// Forgets per-phase results; clears the context if configured to.
    pub fn cleanup(&mut self) {
        self.phase_results.clear();
        for runner in &self.phases {
            runner.clear_last_result();
        }
        if self.config.clear_context_on_cleanup {
            self.context.clear();
        }
        info!("Pipeline cleanup completed");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
