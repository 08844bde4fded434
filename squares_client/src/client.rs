//! Client implementation.
//!
//! The client maintains:
//! - One WebSocket to the relay
//! - Its own square, as assigned by `joined`
//! - The last known square of every peer (no interpolation)

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use anyhow::Context;
use futures::{SinkExt, StreamExt};
use squares_shared::{
    net::{decode_event, encode_event, ClientEvent, ServerEvent},
    square::{Square, SquareHash},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay socket URL for a server address.
pub fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{addr}/ws")
}

/// Headless relay client.
pub struct SquaresClient {
    /// Own square; replaced on send and on any echo from the server.
    pub square: Square,
    /// Peers seen through `updatedMovement`, minus those that `left`.
    pub peers: HashMap<SquareHash, Square>,
    ws: WsStream,
}

impl SquaresClient {
    /// Connects and waits for the `joined` event.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        info!(%url, "Connecting to relay");
        let (mut ws, _response) = connect_async(url)
            .await
            .with_context(|| format!("ws connect {url}"))?;

        let square = loop {
            let msg = ws
                .next()
                .await
                .context("connection closed before joined")?
                .context("ws read")?;
            match msg {
                Message::Text(text) => match decode_event::<ServerEvent>(text.as_str())? {
                    ServerEvent::Joined(square) => break square,
                    other => debug!(event = other.name(), "event before joined ignored"),
                },
                Message::Close(_) => anyhow::bail!("connection closed before joined"),
                _ => {}
            }
        };

        info!(hash = %square.hash, x = square.x, color = %square.color, "Joined");
        Ok(Self {
            square,
            peers: HashMap::new(),
            ws,
        })
    }

    pub fn hash(&self) -> &SquareHash {
        &self.square.hash
    }

    /// Sends `square` as this client's full state. The local copy keeps the
    /// hash assigned on join, whatever hash `square` carries.
    pub async fn send_movement(&mut self, square: &Square) -> anyhow::Result<()> {
        let text = encode_event(&ClientEvent::MovementUpdate(square.clone()))?;
        self.ws
            .send(Message::text(text))
            .await
            .context("ws send movementUpdate")?;
        let mut own = square.clone();
        own.hash = self.square.hash.clone();
        self.square = own;
        Ok(())
    }

    /// Sends a raw text frame. Used to feed the server malformed input.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws
            .send(Message::text(text))
            .await
            .context("ws send raw")
    }

    /// Next event from the server, already applied to local state.
    /// `None` once the server closes the socket.
    pub async fn recv(&mut self) -> anyhow::Result<Option<ServerEvent>> {
        while let Some(msg) = self.ws.next().await {
            match msg.context("ws read")? {
                Message::Text(text) => {
                    let event = decode_event::<ServerEvent>(text.as_str())?;
                    self.apply(&event);
                    return Ok(Some(event));
                }
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    /// Like `recv`, but gives up after `timeout` with `Ok(None)`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> anyhow::Result<Option<ServerEvent>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result,
            Err(_) => Ok(None),
        }
    }

    /// Closes the socket; the server treats this as a disconnect.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await.context("ws close")?;
        Ok(())
    }

    fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::Joined(square) => self.square = square.clone(),
            ServerEvent::UpdatedMovement(square) if square.hash == self.square.hash => {
                self.square = square.clone();
            }
            ServerEvent::UpdatedMovement(square) => {
                self.peers.insert(square.hash.clone(), square.clone());
            }
            ServerEvent::Left(hash) => {
                self.peers.remove(hash);
            }
        }
    }
}
