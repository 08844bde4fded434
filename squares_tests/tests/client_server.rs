//! Full socket-based tests: relay server <-> headless clients.

use std::time::Duration;

use squares_client::SquaresClient;
use squares_shared::{config::ServerConfig, net::ServerEvent};
use squares_tests::{http_get, start_server};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

/// Connect X, connect Y, X falls, X leaves.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_clients_full_scenario() -> anyhow::Result<()> {
    let server = start_server(ServerConfig::default()).await?;

    let mut x = SquaresClient::connect(&server.ws_url()).await?;
    assert!(x.square.x >= 50.0 && x.square.x < 450.0);
    assert_eq!(x.square.y, 0.0);
    assert_eq!(x.square.dest_y, 0.0);

    let mut y = SquaresClient::connect(&server.ws_url()).await?;
    assert_ne!(x.hash(), y.hash());

    // Y joining is not announced to X.
    assert!(x.recv_timeout(QUIET).await?.is_none());

    let mut update = x.square.clone();
    update.dest_y = 396.0;
    x.send_movement(&update).await?;

    match y.recv_timeout(WAIT).await? {
        Some(ServerEvent::UpdatedMovement(sq)) => {
            assert_eq!(&sq.hash, x.hash());
            assert_eq!(sq.dest_y, 400.0);
            assert!(sq.last_update > update.last_update);
        }
        other => anyhow::bail!("expected updatedMovement, got {other:?}"),
    }
    assert_eq!(y.peers.len(), 1);

    // X never hears its own update.
    assert!(x.recv_timeout(QUIET).await?.is_none());

    let x_hash = x.hash().clone();
    x.close().await?;

    match y.recv_timeout(WAIT).await? {
        Some(ServerEvent::Left(hash)) => assert_eq!(hash, x_hash),
        other => anyhow::bail!("expected left, got {other:?}"),
    }
    assert!(y.peers.is_empty());

    let (status, body) = http_get(server.addr, "/status").await?;
    assert_eq!(status, 200);
    assert!(body.contains(y.hash().as_str()));
    assert!(!body.contains(x_hash.as_str()));

    y.close().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn updates_reach_every_peer_but_origin() -> anyhow::Result<()> {
    let server = start_server(ServerConfig::default()).await?;
    let mut a = SquaresClient::connect(&server.ws_url()).await?;
    let mut b = SquaresClient::connect(&server.ws_url()).await?;
    let mut c = SquaresClient::connect(&server.ws_url()).await?;

    let mut update = a.square.clone();
    update.dest_x = 321.0;
    update.dest_y = 450.0;
    a.send_movement(&update).await?;

    for peer in [&mut b, &mut c] {
        match peer.recv_timeout(WAIT).await? {
            Some(ServerEvent::UpdatedMovement(sq)) => {
                assert_eq!(&sq.hash, a.hash());
                assert_eq!(sq.dest_x, 321.0);
                // Past the floor: relayed without correction.
                assert_eq!(sq.dest_y, 450.0);
            }
            other => anyhow::bail!("expected updatedMovement, got {other:?}"),
        }
    }
    assert!(a.recv_timeout(QUIET).await?.is_none());

    let a_hash = a.hash().clone();
    a.close().await?;
    for peer in [&mut b, &mut c] {
        match peer.recv_timeout(WAIT).await? {
            Some(ServerEvent::Left(hash)) => assert_eq!(hash, a_hash),
            other => anyhow::bail!("expected left, got {other:?}"),
        }
        // Exactly one.
        assert!(peer.recv_timeout(QUIET).await?.is_none());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_and_forged_updates() -> anyhow::Result<()> {
    let server = start_server(ServerConfig::default()).await?;
    let mut x = SquaresClient::connect(&server.ws_url()).await?;
    let mut y = SquaresClient::connect(&server.ws_url()).await?;

    // Wrong shape: dropped, connection stays up.
    x.send_raw(r#"{"event":"movementUpdate","data":{"x":"jpeg"}}"#).await?;
    x.send_raw("not json").await?;

    // Claims Y's hash: stored and relayed under X's.
    let x_hash = x.hash().clone();
    let mut forged = x.square.clone();
    forged.hash = y.hash().clone();
    forged.dest_y = 100.0;
    x.send_movement(&forged).await?;

    match y.recv_timeout(WAIT).await? {
        Some(ServerEvent::UpdatedMovement(sq)) => {
            assert_eq!(sq.hash, x_hash);
            assert_eq!(sq.dest_y, 104.0);
        }
        other => anyhow::bail!("expected updatedMovement, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn echo_corrections_snap_origin() -> anyhow::Result<()> {
    let server = start_server(ServerConfig {
        echo_corrections: true,
        ..Default::default()
    })
    .await?;
    let mut x = SquaresClient::connect(&server.ws_url()).await?;
    let hash = x.hash().clone();

    let mut update = x.square.clone();
    update.dest_y = 200.0;
    x.send_movement(&update).await?;

    match x.recv_timeout(WAIT).await? {
        Some(ServerEvent::UpdatedMovement(sq)) => {
            assert_eq!(sq.hash, hash);
            assert_eq!(sq.dest_y, 204.0);
        }
        other => anyhow::bail!("expected own correction, got {other:?}"),
    }
    assert_eq!(x.square.dest_y, 204.0);
    Ok(())
}

/// A forged send must not make the client adopt the foreign hash.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forged_send_keeps_client_identity() -> anyhow::Result<()> {
    let server = start_server(ServerConfig::default()).await?;
    let mut x = SquaresClient::connect(&server.ws_url()).await?;
    let mut y = SquaresClient::connect(&server.ws_url()).await?;
    let x_hash = x.hash().clone();

    let mut forged = x.square.clone();
    forged.hash = y.hash().clone();
    forged.dest_y = 450.0;
    x.send_movement(&forged).await?;
    assert_eq!(x.hash(), &x_hash);
    assert_eq!(x.square.dest_y, 450.0);

    match y.recv_timeout(WAIT).await? {
        Some(ServerEvent::UpdatedMovement(sq)) => assert_eq!(sq.hash, x_hash),
        other => anyhow::bail!("expected updatedMovement, got {other:?}"),
    }

    let mut update = y.square.clone();
    update.dest_x = 333.0;
    update.dest_y = 450.0;
    y.send_movement(&update).await?;

    match x.recv_timeout(WAIT).await? {
        Some(ServerEvent::UpdatedMovement(sq)) => {
            assert_eq!(&sq.hash, y.hash());
            assert_eq!(sq.dest_x, 333.0);
        }
        other => anyhow::bail!("expected updatedMovement, got {other:?}"),
    }
    assert_eq!(x.hash(), &x_hash);
    assert_ne!(x.square.dest_x, 333.0);
    assert_eq!(x.peers.get(y.hash()).map(|sq| sq.dest_x), Some(333.0));
    Ok(())
}
