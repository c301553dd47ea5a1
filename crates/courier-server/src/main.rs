use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use courier_server::{server, telemetry, Cli, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init().map_err(|e| anyhow::anyhow!("Failed to init telemetry: {}", e))?;

    info!("Courier Server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("License: AGPL-3.0");

    let config = ServerConfig::load(&cli)
        .map_err(|e| anyhow::anyhow!("Failed to load server configuration: {}", e))?;
    config.log_config();

    if let Err(e) = server::start(config).await {
        error!(error = %format!("{e:#}"), "Server failed");
        return Err(e);
    }

    info!("Courier Server stopped");
    Ok(())
}
