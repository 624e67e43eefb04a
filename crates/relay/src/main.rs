//! `chat-relay` binary
//!
//! ```bash
//! UPSTREAM_BEARER_TOKEN=... RELAY_BIND_ADDR=0.0.0.0:8787 chat-relay
//! ```

use chat_relay_server::{RelayConfig, RelayServer};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = std::env::var("RELAY_LOG_LEVEL")
        .ok()
        .and_then(|raw| raw.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt().with_max_level(level).init();

    let config = RelayConfig::from_env()?;
    if config.credential().is_none() {
        warn!("No upstream credential configured; chat requests will fail with 500");
    }
    info!(?config, "Starting chat relay");

    RelayServer::new(config)?.run().await?;

    Ok(())
}
