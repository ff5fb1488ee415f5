//! Built-in defaults, the lowest-precedence layer.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("dispatcher.chain_id", 1_u64)?
        .set_default("dispatcher.refill_interval_secs", 86_400_u64)?
        .set_default("dispatcher.request_timeout_ms", 5_000_u64)?
        .set_default("dispatcher.max_retries", 1_u64)?
        .set_default("endpoints.relay_url", "https://api.gelato.digital")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
