//! delayq CLI Binary
//!
//! Command-line interface for the delay-queue dispatcher.

use anyhow::Context;
use clap::Parser;
use delayq::cli::{Cli, Commands, RunContext};
use delayq::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let context = match RunContext::new(cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}", delayq::cli::map_error(&e));
            process::exit(1);
        }
    };

    let logging_config = build_logging_config(&cli, context.config().logging.clone());
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("delayq starting");

    match execute(&context, &cli).await {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn execute(context: &RunContext, cli: &Cli) -> anyhow::Result<String> {
    let name = command_name(&cli.command);
    let output = context
        .execute(&cli.command)
        .await
        .with_context(|| format!("delayq {} failed", name))?;
    Ok(output)
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run { .. } => "run",
        Commands::Watch { .. } => "watch",
        Commands::Cursor { .. } => "cursor",
        Commands::Validate => "validate",
    }
}

/// Build logging configuration from the loaded config and CLI flags.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, mut config: LoggingConfig) -> LoggingConfig {
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    config
}
