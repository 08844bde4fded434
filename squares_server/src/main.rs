//! Standalone relay server binary.
//!
//! Usage:
//!   PORT=3004 cargo run -p squares_server
//!
//! Port comes from `PORT`, then `NODE_PORT`, then 3004. `SQUARES_CONFIG` may
//! name a JSON file with the remaining settings (room, client page, gravity).

use anyhow::Context;
use squares_server::SquaresServer;
use squares_shared::config::ServerConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = ServerConfig::from_env().context("load config")?;
    let server = SquaresServer::bind(cfg).await.context("create server")?;
    let local = server.local_addr()?;
    info!(
        %local,
        room = %server.cfg.room,
        client_page = %server.cfg.client_page,
        "listening on port {}",
        local.port()
    );

    server.serve().await
}
