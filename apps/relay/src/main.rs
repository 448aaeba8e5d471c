//! # Kava Relay Server
//!
//! Standalone broadcast hub for client machines and admin views.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Relay Server                                     │
//! │                                                                         │
//! │  Client view ───► WS /ws (3001) ───► rebroadcast ───► Admin views     │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                    GET /health                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::info;
use tracing_subscriber::EnvFilter;

use kava_sync::{KavaConfig, RelayServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Kava relay server...");

    // Load configuration (KAVA_RELAY_PORT overrides the file)
    let config = KavaConfig::load_or_default(None);
    let relay_config = config.relay_config();
    info!(
        port = relay_config.port,
        bind = %relay_config.bind_addr,
        "Configuration loaded"
    );

    // Start the relay
    let handle = RelayServer::new(relay_config).start().await?;
    info!(addr = %handle.local_addr(), "Relay listening");

    // Run until ctrl-c
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    handle.shutdown().await?;

    Ok(())
}
