//! rps_vision - terminal client.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use rps_vision::{ClientConfig, run_client};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = ClientConfig::load(&cli.config)?;
    if let Some(url) = cli.service_url {
        config = config.with_service_url(url);
    }
    if let Some(camera) = cli.camera {
        config = config.with_camera_source(camera);
    }

    initialize_tracing(&config)?;
    info!(?config, "Starting rps_vision");

    run_client(&config).await
}

/// Sends tracing output to the log file so it never lands on the UI.
#[instrument(skip(config))]
fn initialize_tracing(config: &ClientConfig) -> Result<()> {
    let log_file = std::fs::File::create(config.log_file())?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rps_vision=debug")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
