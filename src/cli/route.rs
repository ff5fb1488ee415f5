//! CLI route: single route table and run context. Wires configured services into a dispatcher.

use crate::cli::output::{format_cursor, format_outcome};
use crate::cli::parse::{Commands, OutputFormat};
use crate::config::{ConfigLoader, DelayqConfig};
use crate::dispatch::{DispatchCursor, Dispatcher, SledCursorStore};
use crate::error::{DispatchError, StorageError};
use crate::index::GraphQueueIndex;
use crate::ledger::RpcLedger;
use crate::relay::SponsoredRelay;
use crate::types::Timestamp;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Current system time in unix seconds
pub fn current_timestamp() -> Timestamp {
    Timestamp::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: DelayqConfig,
}

impl RunContext {
    /// Load configuration from `config_path` or the default locations
    pub fn new(config_path: Option<&Path>) -> Result<Self, DispatchError> {
        let config = ConfigLoader::load(config_path)?;
        Ok(Self { config })
    }

    pub fn from_config(config: DelayqConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DelayqConfig {
        &self.config
    }

    fn open_store(&self) -> Result<SledCursorStore, DispatchError> {
        let path = &self.config.storage.cursor_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StorageError::IoError)?;
        }
        Ok(SledCursorStore::new(path)?)
    }

    /// Build a dispatcher against the configured endpoints
    pub fn build_dispatcher(&self) -> Result<Dispatcher, DispatchError> {
        let config = self.config.clone().validated()?;
        let settings = config.dispatch_settings()?;
        let timeout = config.request_timeout();
        let endpoints = &config.endpoints;

        let ledger = RpcLedger::new(endpoints.rpc_url.clone(), timeout)?;
        let index = GraphQueueIndex::new(endpoints.index_url.clone(), timeout)?;
        let relay = SponsoredRelay::new(
            endpoints.relay_url.clone(),
            config.dispatcher.chain_id,
            endpoints.relay_api_key.clone().unwrap_or_default(),
            timeout,
        )?;
        let store = self.open_store()?;

        info!(
            instance = %settings.instance,
            chain_id = config.dispatcher.chain_id,
            gas_allowance = settings.allowance.full,
            "Dispatcher configured"
        );

        Ok(Dispatcher::new(
            Arc::new(ledger),
            Arc::new(index),
            Arc::new(relay),
            Arc::new(store),
            settings,
        ))
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, DispatchError> {
        match command {
            Commands::Run { now, format } => {
                let dispatcher = self.build_dispatcher()?;
                let now = now.unwrap_or_else(current_timestamp);
                let outcome = dispatcher.run(now).await?;
                Ok(format_outcome(&outcome, *format))
            }
            Commands::Watch { every, max_runs } => {
                let dispatcher = self.build_dispatcher()?;
                let runs = watch(&dispatcher, Duration::from_secs((*every).max(1)), *max_runs).await;
                Ok(format!("Stopped after {} run(s)", runs))
            }
            Commands::Cursor { format } => {
                let store = self.open_store()?;
                let cursor = DispatchCursor::load(&store)?;
                Ok(format_cursor(cursor.as_ref(), *format))
            }
            Commands::Validate => {
                self.config.clone().validated()?;
                Ok("Configuration is valid".to_string())
            }
        }
    }
}

/// Run invocations back to back on one task until interrupted or `max_runs` is reached.
///
/// Run-level failures are reported and the next tick retries from the persisted cursor.
async fn watch(dispatcher: &Dispatcher, every: Duration, max_runs: Option<u64>) -> u64 {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!(runs, "Interrupted, stopping watch");
                return runs;
            }
        }

        match dispatcher.run(current_timestamp()).await {
            Ok(outcome) => {
                info!(%outcome, "Run finished");
                println!("{}", format_outcome(&outcome, OutputFormat::Text));
            }
            Err(e) => {
                error!(error = %e, "Run failed");
                eprintln!("{}", e);
            }
        }
        runs += 1;

        if max_runs.is_some_and(|max| runs >= max) {
            return runs;
        }
    }
}
