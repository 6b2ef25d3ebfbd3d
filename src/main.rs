//! slirc-link - Straylight IRC Link
//!
//! Keeps one IRC connection alive until interrupted.

use std::sync::Arc;

use slirc_link::config::{self, LinkConfig};
use slirc_link::{LinkManager, TcpConnector};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "link.toml".to_string());

    let config = LinkConfig::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    let mut problems: Vec<String> = match config::validate(&config) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    };
    if let Err(e) = config::validate_connector(&config) {
        problems.push(e.to_string());
    }
    if !problems.is_empty() {
        for problem in &problems {
            error!(path = %config_path, "{}", problem);
        }
        anyhow::bail!("{} configuration error(s) in {}", problems.len(), config_path);
    }

    let connector = config
        .connector_config()
        .map(TcpConnector::from_config)
        .ok_or_else(|| anyhow::anyhow!("connector '{}' not found", config.connector))?;

    info!(
        connector = %config.connector,
        nickname = %config.nickname,
        "Starting slirc-link"
    );

    let manager = LinkManager::new(config, Arc::new(connector));
    manager.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    if let Err(e) = manager.send_raw("QUIT :Shutting down").await {
        warn!(error = %e, "could not send QUIT");
    }
    manager.stop(true).await;

    Ok(())
}
