//! Phase trait and implementations.
//!
//! Phases are the units of work a pipeline runs, one after another.
//! Implementors supply `execute` and `validate_input`; dependency checks,
//! timeouts and error capture are handled by [`PhaseRunner`].

mod config;
mod runner;

pub use config::PhaseConfig;
pub use runner::PhaseRunner;

use crate::context::{ContextData, PipelineContext};
use async_trait::async_trait;
use std::fmt::{self, Debug};

/// Trait for pipeline phases.
#[async_trait]
pub trait Phase: Send + Sync + Debug {
    /// Returns the phase configuration.
    fn config(&self) -> &PhaseConfig;

    /// Returns the name of the phase.
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Executes the phase.
    ///
    /// The returned data is merged into the pipeline context only if the
    /// attempt succeeds. Errors are retried unless they are validation-class
    /// [`PlatformError`](crate::errors::PlatformError)s.
    async fn execute(&self, ctx: &PipelineContext) -> anyhow::Result<ContextData>;

    /// Checks the phase's own preconditions. Must not have side effects.
    fn validate_input(&self, ctx: &PipelineContext) -> bool;

    /// Returns warnings to attach to a successful result.
    fn warnings(&self, _ctx: &PipelineContext, _data: &ContextData) -> Vec<String> {
        Vec::new()
    }
}

type InputValidator = Box<dyn Fn(&PipelineContext) -> bool + Send + Sync>;

/// A phase backed by a synchronous closure.
pub struct FnPhase<F>
where
    F: Fn(&PipelineContext) -> anyhow::Result<ContextData> + Send + Sync,
{
    config: PhaseConfig,
    func: F,
    validator: Option<InputValidator>,
}

impl<F> FnPhase<F>
where
    F: Fn(&PipelineContext) -> anyhow::Result<ContextData> + Send + Sync,
{
    /// Creates a new function-based phase that accepts any input.
    pub fn new(config: PhaseConfig, func: F) -> Self {
        Self {
            config,
            func,
            validator: None,
        }
    }

    /// Sets the input validator.
    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&PipelineContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }
}

impl<F> Debug for FnPhase<F>
where
    F: Fn(&PipelineContext) -> anyhow::Result<ContextData> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPhase")
            .field("name", &self.config.name)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

#[async_trait]
impl<F> Phase for FnPhase<F>
where
    F: Fn(&PipelineContext) -> anyhow::Result<ContextData> + Send + Sync,
{
    fn config(&self) -> &PhaseConfig {
        &self.config
    }

    async fn execute(&self, ctx: &PipelineContext) -> anyhow::Result<ContextData> {
        (self.func)(ctx)
    }

    fn validate_input(&self, ctx: &PipelineContext) -> bool {
        self.validator.as_ref().map_or(true, |validate| validate(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_phase() {
        let phase = FnPhase::new(PhaseConfig::new("double"), |ctx| {
            let x = ctx.get_as::<i64>("x").unwrap_or_default();
            let mut out = ContextData::new();
            out.insert("y".to_string(), json!(x * 2));
            Ok(out)
        });

        let mut ctx = PipelineContext::new();
        ctx.insert("x", json!(21));

        assert_eq!(phase.name(), "double");
        assert!(phase.validate_input(&ctx));
        let out = phase.execute(&ctx).await.unwrap();
        assert_eq!(out.get("y"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_fn_phase_validator() {
        let phase = FnPhase::new(PhaseConfig::new("needs_org"), |_ctx| Ok(ContextData::new()))
            .with_validator(|ctx| ctx.contains_key("org"));

        assert!(!phase.validate_input(&PipelineContext::new()));
        assert!(phase.warnings(&PipelineContext::new(), &ContextData::new()).is_empty());
    }
}
