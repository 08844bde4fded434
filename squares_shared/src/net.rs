//! Wire events exchanged over the WebSocket.
//!
//! Every frame is a JSON text envelope `{"event": <name>, "data": <payload>}`.
//! Square payloads must carry every field; unknown fields are ignored.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::square::{Square, SquareHash};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a live connection for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub fn new_unique() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Server -> client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// The connection's own square, sent once after connect.
    #[serde(rename = "joined")]
    Joined(Square),
    /// A peer's accepted state.
    #[serde(rename = "updatedMovement")]
    UpdatedMovement(Square),
    /// A peer disconnected.
    #[serde(rename = "left")]
    Left(SquareHash),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Joined(_) => "joined",
            ServerEvent::UpdatedMovement(_) => "updatedMovement",
            ServerEvent::Left(_) => "left",
        }
    }
}

/// Client -> server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// The client's full proposed state.
    #[serde(rename = "movementUpdate")]
    MovementUpdate(Square),
}

/// Serializes an event into a text frame.
pub fn encode_event<T: Serialize>(event: &T) -> anyhow::Result<String> {
    serde_json::to_string(event).context("serialize event")
}

/// Parses a text frame into an event.
pub fn decode_event<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    serde_json::from_str(text).context("deserialize event")
}
