//! Integration tests for layered configuration loading

use super::test_utils::ENV_MUTEX;
use delayq::config::{user_config_path, ConfigLoader};
use delayq::types::Address;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tempfile::TempDir;

const INSTANCE: &str = "0x0b7a9a6f1c4e739df11f55c6879d48c9851a2162";

fn write_config(dir: &Path, allowance: u64) -> std::path::PathBuf {
    let path = dir.join("delayq.toml");
    fs::write(
        &path,
        format!(
            r#"
[dispatcher]
instance = "{}"
gas_allowance = {}

[endpoints]
rpc_url = "http://localhost:8545"
index_url = "http://localhost:8000/subgraphs/name/delay"
relay_api_key = "secret"
"#,
            INSTANCE, allowance
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), 300_000);

    std::env::set_var("DELAYQ__DISPATCHER__GAS_ALLOWANCE", "777");
    let loaded = ConfigLoader::load(Some(&path));
    std::env::remove_var("DELAYQ__DISPATCHER__GAS_ALLOWANCE");

    let config = loaded.unwrap();
    assert_eq!(config.dispatcher.gas_allowance, 777);
    assert_eq!(
        config.dispatcher.instance,
        Some(Address::from_str(INSTANCE).unwrap())
    );
}

#[test]
fn test_file_values_and_defaults_combine() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), 300_000);

    let config = ConfigLoader::load(Some(&path)).unwrap();
    assert_eq!(config.dispatcher.gas_allowance, 300_000);
    assert_eq!(config.dispatcher.chain_id, 1);
    assert_eq!(config.dispatcher.refill_interval_secs, 86_400);
    assert_eq!(config.endpoints.relay_url, "https://api.gelato.digital");
    assert_eq!(config.logging.output, "stderr");

    let settings = config.validated().unwrap().dispatch_settings().unwrap();
    assert_eq!(settings.allowance.full, 300_000);
    assert_eq!(settings.policy.max_retries, 1);
}

#[test]
fn test_missing_explicit_file_fails() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    assert!(ConfigLoader::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_incomplete_config_lists_every_problem() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("delayq.toml");
    fs::write(&path, "[dispatcher]\nchain_id = 5\n").unwrap();

    let config = ConfigLoader::load(Some(&path)).unwrap();
    let errors = config.validate().unwrap_err();
    let text: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert!(text.iter().any(|e| e.contains("instance")));
    assert!(text.iter().any(|e| e.contains("gas_allowance")));
    assert!(text.iter().any(|e| e.contains("rpc_url")));
    assert!(text.iter().any(|e| e.contains("relay_api_key")));
}

#[test]
fn test_user_config_path_follows_xdg() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let original = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let path = user_config_path();

    match original {
        Some(orig) => std::env::set_var("XDG_CONFIG_HOME", orig),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    assert_eq!(path, Some(dir.path().join("delayq").join("config.toml")));
}
