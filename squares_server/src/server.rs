//! HTTP and WebSocket surface.
//!
//! Routes:
//! - `GET /`       client page, read from disk on every request
//! - `GET /ws`     relay socket (JSON text frames)
//! - `GET /status` room snapshot as JSON
//!
//! Each socket gets a reader task (frames -> relay) and a writer task
//! (outbox -> frames). Whichever ends first tears down the other, then the
//! relay is told the connection is gone.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use squares_shared::{
    config::ServerConfig,
    net::{decode_event, encode_event, ClientEvent, ConnectionId, ServerEvent},
};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
};
use tracing::{debug, error, info, warn};

use crate::relay::{Relay, RelayEvent, RelayHandle, RelayStatus};

#[derive(Clone)]
struct AppState {
    relay: RelayHandle,
    client_page: Arc<PathBuf>,
}

/// Request failure surfaced as a 500.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %format!("{:#}", self.0), "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        AppError(e.into())
    }
}

/// Bound relay server, not yet serving.
pub struct SquaresServer {
    pub cfg: ServerConfig,
    listener: TcpListener,
}

impl SquaresServer {
    /// Binds the listener from config.
    pub async fn bind(cfg: ServerConfig) -> anyhow::Result<Self> {
        let addr = cfg.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("tcp bind {addr}"))?;
        Ok(Self { cfg, listener })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Routes wired to an already running relay.
    pub fn router(relay: RelayHandle, client_page: PathBuf) -> Router {
        let state = AppState {
            relay,
            client_page: Arc::new(client_page),
        };
        Router::new()
            .route("/", get(serve_client_page))
            .route("/ws", get(ws_handler))
            .route("/status", get(serve_status))
            .with_state(state)
    }

    /// Starts the relay task and serves until the listener fails.
    pub async fn serve(self) -> anyhow::Result<()> {
        let (relay, _relay_task) = Relay::from_config(&self.cfg).spawn();
        let app = Self::router(relay, PathBuf::from(&self.cfg.client_page));
        axum::serve(self.listener, app).await.context("http serve")
    }
}

/// Helper for tests: bind to an ephemeral localhost port.
pub async fn bind_ephemeral(cfg: ServerConfig) -> anyhow::Result<(SquaresServer, ServerConfig)> {
    let mut cfg = ServerConfig {
        bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST).to_string(),
        port: 0,
        ..cfg
    };
    let server = SquaresServer::bind(cfg.clone()).await?;
    cfg.port = server.local_addr()?.port();
    Ok((SquaresServer { cfg: cfg.clone(), ..server }, cfg))
}

async fn serve_client_page(State(state): State<AppState>) -> Result<Html<Vec<u8>>, AppError> {
    let page = tokio::fs::read(state.client_page.as_path())
        .await
        .with_context(|| format!("read client page {}", state.client_page.display()))?;
    Ok(Html(page))
}

async fn serve_status(State(state): State<AppState>) -> Result<Json<RelayStatus>, AppError> {
    let (reply, status) = oneshot::channel();
    state
        .relay
        .send(RelayEvent::Status { reply })
        .map_err(|_| anyhow::anyhow!("relay stopped"))?;
    Ok(Json(status.await.context("relay dropped status request")?))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.relay))
}

async fn handle_socket(socket: WebSocket, relay: RelayHandle) {
    let conn = ConnectionId::new_unique();
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerEvent>();

    if relay.send(RelayEvent::Connected { conn, outbox }).is_err() {
        warn!(%conn, "relay stopped, refusing connection");
        return;
    }
    info!(%conn, "connection accepted");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let text = match encode_event(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%conn, error = %e, "dropping unencodable event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let to_relay = relay.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match decode_event::<ClientEvent>(text.as_str()) {
                    Ok(ClientEvent::MovementUpdate(square)) => {
                        if to_relay.send(RelayEvent::Movement { conn, square }).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(%conn, error = %format!("{e:#}"), "rejected client frame"),
                },
                Message::Close(_) => break,
                _ => debug!(%conn, "ignoring non-text frame"),
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    let _ = relay.send(RelayEvent::Disconnected { conn });
    info!(%conn, "connection closed");
}
