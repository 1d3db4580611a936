//! Drowsiness Alert Server - Main Entry Point

use anyhow::Context;
use api::{init_logging, install_metrics, run_server, Settings};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::var_os("DROWSY_CONFIG").map(PathBuf::from);
    let settings = Settings::load(path.as_deref()).context("loading settings")?;

    init_logging(settings.server.level()?, settings.server.json_logs)?;

    info!("=== Drowsiness Alert Server v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = if settings.server.metrics_enabled {
        Some(install_metrics().context("installing metrics recorder")?)
    } else {
        None
    };

    run_server(settings, metrics).await
}
