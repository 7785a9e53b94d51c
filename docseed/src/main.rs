//! docseed CLI - resets, defines and seeds the library collections.

use std::process::ExitCode;
use clap::Parser;
use tracing::{error, info};

use docseed::{cli, config::Config, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    if let Err(err) = logging::init(&config.log_level) {
        eprintln!("docseed: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = config.open_store().await?;

    info!(backend = ?config.backend, database = %config.database, "store opened");

    cli::run(store, config.command.unwrap_or_default()).await
}
