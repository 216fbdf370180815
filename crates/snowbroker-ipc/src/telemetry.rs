//! Process-wide `tracing` setup.

use snowbroker_types::{BrokerError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Build the level filter: `RUST_LOG` wins, then the configured directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|e| {
        BrokerError::Configuration(format!("invalid log filter {:?}: {e}", config.filter))
    })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_level(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init()
    };
    installed.map_err(|e| BrokerError::Configuration(format!("tracing already initialised: {e}")))?;

    tracing::info!(
        service = snowbroker_types::constants::SERVICE_NAME,
        version = snowbroker_types::constants::VERSION,
        json = config.json,
        "Logging initialised"
    );
    Ok(())
}
