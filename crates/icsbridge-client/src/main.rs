//! icsbridge CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use icsbridge_core::{TracingConfig, init_tracing};

use icsbridge_client::cli::{Cli, Command, ConfigAction};
use icsbridge_client::commands;
use icsbridge_client::config::ClientConfig;
use icsbridge_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else if matches!(cli.command, Command::Run) {
        TracingConfig::runner()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
    .map_err(ClientError::Config)?;

    match cli.command {
        Command::Export { json } => commands::export::run(&config, json).await,
        Command::Run => commands::run::run(&config).await,
        Command::Check => commands::check::run(&config),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
