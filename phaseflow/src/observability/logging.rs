//! `tracing-subscriber` setup.

use crate::config::LoggingConfig;
use crate::errors::PhaseflowError;
use tracing_subscriber::EnvFilter;

/// Builds the event filter. `RUST_LOG` wins over `config.level`.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, PhaseflowError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|err| PhaseflowError::Logging(format!("invalid level '{}': {err}", config.level)))
}

/// Installs a global `fmt` subscriber writing to stderr.
///
/// Returns an error instead of panicking when a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), PhaseflowError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| PhaseflowError::Logging(err.to_string()))
}
