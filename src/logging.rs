//! Logging System
//!
//! Structured logging on `tracing`. Level, format and destination come from
//! the `[logging]` config section, overridden by `DELAYQ_LOG*` environment
//! variables.

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub const LOG_ENV: &str = "DELAYQ_LOG";
pub const LOG_FORMAT_ENV: &str = "DELAYQ_LOG_FORMAT";
pub const LOG_OUTPUT_ENV: &str = "DELAYQ_LOG_OUTPUT";
pub const LOG_MODULES_ENV: &str = "DELAYQ_LOG_MODULES";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout, stderr or file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is "file"
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Colored output (text format on a terminal stream only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `delayq::dispatch = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

// stdout carries command output
fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("delayq.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
            modules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogOutput {
    Stdout,
    Stderr,
    File,
}

fn config_error(msg: String) -> DispatchError {
    DispatchError::ConfigError(msg)
}

/// Initialize the global subscriber.
///
/// Priority order (highest to lowest):
/// 1. Environment variables (`DELAYQ_LOG`, `DELAYQ_LOG_FORMAT`, ...)
/// 2. Configuration (which already folds in CLI flags and config files)
/// 3. Defaults
pub fn init_logging(config: &LoggingConfig) -> Result<(), DispatchError> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;

    let (writer, ansi) = match output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), config.color),
        LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), config.color),
        LogOutput::File => (BoxMakeWriter::new(Mutex::new(open_log_file(&config.file)?)), false),
    };

    let registry = Registry::default().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    }
    .map_err(|e| config_error(format!("Failed to install log subscriber: {}", e)))
}

fn open_log_file(path: &Path) -> Result<std::fs::File, DispatchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| config_error(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| config_error(format!("Failed to open log file {:?}: {}", path, e)))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, DispatchError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    let mut directives: Vec<String> = config
        .modules
        .iter()
        .map(|(module, level)| format!("{}={}", module, level))
        .collect();
    if let Ok(modules) = std::env::var(LOG_MODULES_ENV) {
        directives.extend(parse_module_directives(&modules));
    }

    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| config_error(format!("Invalid log directive {:?}: {}", directive, e)))?,
        );
    }
    Ok(filter)
}

/// `a=debug, b = warn` into directives; malformed pairs are skipped
fn parse_module_directives(spec: &str) -> Vec<String> {
    spec.split(',')
        .filter_map(|pair| {
            let (module, level) = pair.split_once('=')?;
            let (module, level) = (module.trim(), level.trim());
            (!module.is_empty() && !level.is_empty()).then(|| format!("{}={}", module, level))
        })
        .collect()
}

fn determine_format(config: &LoggingConfig) -> Result<LogFormat, DispatchError> {
    if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
        if let Ok(parsed) = parse_format(&format) {
            return Ok(parsed);
        }
    }
    parse_format(&config.format)
}

fn parse_format(format: &str) -> Result<LogFormat, DispatchError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(config_error(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

fn determine_output(config: &LoggingConfig) -> Result<LogOutput, DispatchError> {
    match std::env::var(LOG_OUTPUT_ENV) {
        Ok(output) => parse_output(&output),
        Err(_) => parse_output(&config.output),
    }
}

fn parse_output(output: &str) -> Result<LogOutput, DispatchError> {
    match output {
        "stdout" => Ok(LogOutput::Stdout),
        "stderr" => Ok(LogOutput::Stderr),
        "file" => Ok(LogOutput::File),
        other => Err(config_error(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
            other
        ))),
    }
}

/// Check a logging section without installing anything
pub fn validate(config: &LoggingConfig) -> Result<(), String> {
    parse_format(&config.format).map_err(|e| e.to_string())?;
    parse_output(&config.output).map_err(|e| e.to_string())?;
    if config.level != "off" {
        config
            .level
            .parse::<tracing::level_filters::LevelFilter>()
            .map_err(|_| format!("Invalid log level: {}", config.level))?;
    }
    Ok(())
}
