//! Configuration System
//!
//! Layered configuration for the dispatcher: built-in defaults, then a TOML
//! file (explicit path or the user config file), then `DELAYQ__SECTION__KEY`
//! environment overrides. Validation reports every problem at once.

use crate::dispatch::{Allowance, CallPolicy, DispatchSettings};
use crate::error::DispatchError;
use crate::logging::LoggingConfig;
use crate::types::{Address, Gas};
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod defaults;
mod sources;

pub use sources::user_file::user_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayqConfig {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which queue to serve and how to budget it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Queue instance address
    #[serde(default)]
    pub instance: Option<Address>,

    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Budget ceiling and refill amount per interval
    #[serde(default)]
    pub gas_allowance: Gas,

    #[serde(default = "default_refill_interval")]
    pub refill_interval_secs: u64,

    /// Timeout of each outbound request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// 0 or 1
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_chain_id() -> u64 {
    1
}

fn default_refill_interval() -> u64 {
    86_400
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    1
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            instance: None,
            chain_id: default_chain_id(),
            gas_allowance: 0,
            refill_interval_secs: default_refill_interval(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Remote collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Ethereum JSON-RPC endpoint
    #[serde(default)]
    pub rpc_url: String,

    /// GraphQL subgraph indexing the queue
    #[serde(default)]
    pub index_url: String,

    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    #[serde(default)]
    pub relay_api_key: Option<String>,
}

fn default_relay_url() -> String {
    "https://api.gelato.digital".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            index_url: String::new(),
            relay_url: default_relay_url(),
            relay_api_key: None,
        }
    }
}

/// Local persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database holding the dispatch cursor
    #[serde(default = "default_cursor_path")]
    pub cursor_path: PathBuf,
}

fn default_cursor_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "delayq")
        .map(|dirs| dirs.data_dir().join("cursor"))
        .unwrap_or_else(|| PathBuf::from(".delayq").join("cursor"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cursor_path: default_cursor_path(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Dispatcher(String),
    Endpoint(String, String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Dispatcher(msg) => write!(f, "Dispatcher: {}", msg),
            ValidationError::Endpoint(name, msg) => write!(f, "Endpoint '{}': {}", name, msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

fn check_url(name: &str, url: &str, errors: &mut Vec<ValidationError>) {
    if url.is_empty() {
        errors.push(ValidationError::Endpoint(name.to_string(), "must be set".to_string()));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ValidationError::Endpoint(
            name.to_string(),
            format!("'{}' is not an http(s) URL", url),
        ));
    }
}

impl DelayqConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let dispatcher = &self.dispatcher;

        match dispatcher.instance {
            None => errors.push(ValidationError::Dispatcher("instance must be set".to_string())),
            Some(addr) if addr == Address::ZERO => errors.push(ValidationError::Dispatcher(
                "instance can not be the zero address".to_string(),
            )),
            Some(_) => {}
        }
        if dispatcher.gas_allowance == 0 {
            errors.push(ValidationError::Dispatcher(
                "gas_allowance must be greater than zero".to_string(),
            ));
        }
        if dispatcher.request_timeout_ms == 0 {
            errors.push(ValidationError::Dispatcher(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if dispatcher.max_retries > 1 {
            errors.push(ValidationError::Dispatcher(format!(
                "max_retries must be 0 or 1 (got {})",
                dispatcher.max_retries
            )));
        }

        check_url("rpc_url", &self.endpoints.rpc_url, &mut errors);
        check_url("index_url", &self.endpoints.index_url, &mut errors);
        check_url("relay_url", &self.endpoints.relay_url, &mut errors);
        if self
            .endpoints
            .relay_api_key
            .as_deref()
            .map_or(true, str::is_empty)
        {
            errors.push(ValidationError::Endpoint(
                "relay_api_key".to_string(),
                "must be set".to_string(),
            ));
        }

        if self.storage.cursor_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("cursor_path cannot be empty".to_string()));
        }

        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all errors into one
    pub fn validated(self) -> Result<Self, DispatchError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            DispatchError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatcher.request_timeout_ms)
    }

    pub fn dispatch_settings(&self) -> Result<DispatchSettings, DispatchError> {
        let instance = self
            .dispatcher
            .instance
            .ok_or_else(|| DispatchError::ConfigError("dispatcher.instance must be set".to_string()))?;
        Ok(DispatchSettings {
            instance,
            allowance: Allowance {
                full: self.dispatcher.gas_allowance,
                refill_interval: self.dispatcher.refill_interval_secs,
            },
            policy: CallPolicy {
                timeout: self.request_timeout(),
                max_retries: self.dispatcher.max_retries,
            },
        })
    }
}

/// Loads [`DelayqConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then `explicit` (required) or the user config file (optional), then environment
    pub fn load(explicit: Option<&Path>) -> Result<DelayqConfig, ConfigError> {
        let builder = defaults::builder_with_defaults()?;
        let builder = match explicit {
            Some(path) => sources::explicit_file::add_to_builder(builder, path)?,
            None => sources::user_file::add_to_builder(builder)?,
        };
        let builder = sources::add_env(builder);
        builder.build()?.try_deserialize()
    }

    /// Defaults and a single file, no environment
    pub fn load_from_file(path: &Path) -> Result<DelayqConfig, ConfigError> {
        let builder = defaults::builder_with_defaults()?;
        sources::explicit_file::add_to_builder(builder, path)?
            .build()?
            .try_deserialize()
    }
}
