//! Headless demo bot.
//!
//! Usage:
//!   cargo run -p squares_client
//!   SQUARES_URL=ws://10.0.0.5:3004/ws cargo run -p squares_client
//!
//! Joins the room, wanders sideways while falling, and logs what peers do.
//! Without `SQUARES_URL` it connects to localhost on `PORT`, then
//! `NODE_PORT`, then 3004, the same order the server uses.

use std::time::Duration;

use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use squares_client::SquaresClient;
use squares_shared::{
    config::{resolve_port, DEFAULT_PORT},
    net::ServerEvent,
    physics::{FloorGravity, Physics},
    square::Square,
};
use tracing::{debug, info};

const SEND_INTERVAL: Duration = Duration::from_millis(50);
const FIELD_WIDTH: f64 = 500.0;

fn relay_url() -> anyhow::Result<String> {
    relay_url_from(|key| std::env::var(key).ok())
}

/// `SQUARES_URL` wins; otherwise localhost on the port the server would pick.
fn relay_url_from(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    if let Some(url) = lookup("SQUARES_URL").filter(|u| !u.is_empty()) {
        return Ok(url);
    }
    let port = resolve_port(lookup("PORT"), lookup("NODE_PORT"))?.unwrap_or(DEFAULT_PORT);
    Ok(format!("ws://127.0.0.1:{port}/ws"))
}

/// Next frame: settle on the previous destination, pick a new one nearby.
fn next_frame<R: Rng>(current: &Square, rng: &mut R) -> Square {
    let mut next = current.clone();
    next.prev_x = current.x;
    next.prev_y = current.y;
    next.x = current.dest_x;
    next.y = current.dest_y;
    next.dest_x = (current.dest_x + rng.gen_range(-5.0..=5.0)).clamp(0.0, FIELD_WIDTH - next.width);
    next.alpha = 0.0;
    next
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let url = relay_url()?;
    let mut client = SquaresClient::connect(&url)
        .await
        .with_context(|| format!("connect to {url}"))?;

    // The server drops every accepted update by the same rule; mirror it so
    // the next frame starts from what peers were sent.
    let gravity = FloorGravity::default();
    let mut rng = StdRng::from_entropy();
    let mut ticker = tokio::time::interval(SEND_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = next_frame(&client.square, &mut rng);
                client.send_movement(&frame).await?;
                let mut committed = frame;
                gravity.apply(&mut committed);
                client.square = committed;
            }
            event = client.recv() => match event? {
                Some(ServerEvent::UpdatedMovement(sq)) => {
                    debug!(hash = %sq.hash, x = sq.x, dest_y = sq.dest_y, "peer moved");
                }
                Some(ServerEvent::Left(hash)) => {
                    info!(%hash, peers = client.peers.len(), "peer left");
                }
                Some(ServerEvent::Joined(_)) => {}
                None => {
                    info!("server closed the connection");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                client.close().await?;
                break;
            }
        }
    }
    Ok(())
}
