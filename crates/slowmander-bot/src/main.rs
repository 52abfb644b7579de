//! Main entry point for Slowmander.

use slowmander_bot::{BotResult, Slowmander, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use slowmander_common::logging::init_logging;
use slowmander_config::ConfigLoader;
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Slowmander stopped");
            eprintln!("slowmander: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> BotResult<()> {
    let path = env::args()
        .nth(1)
        .or_else(|| env::var(ENV_CONFIG_PATH).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = ConfigLoader::new(&path).load().await?;
    let _guard = init_logging(&config.logging)?;
    info!(path = %path, version = env!("CARGO_PKG_VERSION"), "Starting Slowmander");

    Slowmander::new(config).start().await
}
