//! `deskmate serve` — Start the HTTP API server.

use std::path::Path;

use deskmate_config::AppConfig;

pub async fn run(
    config_path: &Path,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        AppConfig::load_with(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    tracing::debug!(path = %config_path.display(), config = ?config, "Config loaded");

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Deskmate");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Storage:   {}", config.storage.backend);
    println!("   Model:     {}", config.provider.model);

    deskmate_gateway::start(config).await?;

    Ok(())
}
