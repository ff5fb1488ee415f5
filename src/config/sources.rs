//! Configuration sources above the defaults.

pub mod explicit_file;
pub mod user_file;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

/// Environment prefix; `DELAYQ__DISPATCHER__GAS_ALLOWANCE` maps to `dispatcher.gas_allowance`
pub const ENV_PREFIX: &str = "DELAYQ";

/// Add `DELAYQ__SECTION__KEY` overrides, the highest-precedence layer.
pub fn add_env(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
