//! Glyph Duel Server
//!
//! Serves solo rounds and duels over WebSocket.
//! Configured through `GLYPH_DUEL_*` environment variables.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use glyph_duel::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Glyph Duel Server v{}", VERSION);

    let config = ServerConfig::from_env();
    info!(
        bind = %config.bind_addr,
        max_connections = config.max_connections,
        cooldown_ms = config.cooldown.as_millis() as u64,
        results_sink = %config.engine.results_sink,
        "Configuration loaded"
    );

    let server = std::sync::Arc::new(GameServer::from_config(config)?);

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
