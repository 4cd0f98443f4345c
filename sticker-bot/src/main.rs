//! Sticker Bot - Main entry point.

use anyhow::{Context, Result};
use sticker_common::config::Config;
use sticker_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    config.validate().context("Invalid configuration")?;

    tracing::info!("Sticker Bot v{}", env!("CARGO_PKG_VERSION"));

    sticker_bot::run(&config).await
}
