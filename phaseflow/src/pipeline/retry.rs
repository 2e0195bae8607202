//! Backoff between phase retry attempts.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base
    Constant,
}

/// Randomization applied on top of the computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Use the computed delay as is.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Delay policy between attempts of a failing phase.
///
/// With the defaults the wait after the failed attempt `n` (0-based) is
/// exactly `2^n` seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Delay unit in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,
    /// Growth strategy.
    pub strategy: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            strategy: BackoffStrategy::Exponential,
            jitter: JitterStrategy::None,
        }
    }
}

impl BackoffPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never waits. Handy for tests and dry runs.
    #[must_use]
    pub fn immediate() -> Self {
        Self::default().with_base_delay_ms(0)
    }

    /// Sets the delay unit.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the growth strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the wait after the failed attempt `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms;
        let delay = match self.strategy {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(attempt)),
            BackoffStrategy::Linear => base.saturating_mul(u64::from(attempt) + 1),
            BackoffStrategy::Constant => base,
        }
        .min(self.max_delay_ms);

        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full if delay > 0 => rand::thread_rng().gen_range(0..=delay),
            JitterStrategy::Equal if delay / 2 > 0 => {
                let half = delay / 2;
                half + rand::thread_rng().gen_range(0..=half)
            }
            JitterStrategy::Full | JitterStrategy::Equal => delay,
        };

        Duration::from_millis(jittered)
    }
}
