//! User config file: $XDG_CONFIG_HOME/delayq/config.toml or ~/.config/delayq/config.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::PathBuf;
use tracing::debug;

/// Path to the user config file, if a home or XDG directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join("delayq").join("config.toml"));
    }
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config").join("delayq").join("config.toml"))
}

/// Add the user config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match user_config_path() {
        Some(path) if path.exists() => {
            debug!(config_path = %path.display(), "Loading user configuration");
            Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(false)))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No user configuration file");
            Ok(builder)
        }
        None => Ok(builder),
    }
}
