//! Connection lifecycle and broadcast relay.
//!
//! The `Relay` owns the square store and the room. Connection tasks never
//! touch either; they post `RelayEvent`s to a single consumer, so every event
//! runs to completion before the next one is looked at.
//!
//! Per connection: connect -> joined -> (movement)* -> disconnect.

use std::collections::HashMap;

use serde::Serialize;
use squares_shared::{
    config::ServerConfig,
    net::{ConnectionId, ServerEvent},
    physics::Physics,
    square::{Square, SquareHash},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    room::{Outbox, Room},
    store::SquareStore,
};

/// Inputs to the relay task.
#[derive(Debug)]
pub enum RelayEvent {
    Connected { conn: ConnectionId, outbox: Outbox },
    Movement { conn: ConnectionId, square: Square },
    Disconnected { conn: ConnectionId },
    Status { reply: oneshot::Sender<RelayStatus> },
}

/// Sender side of the relay task's queue.
pub type RelayHandle = mpsc::UnboundedSender<RelayEvent>;

/// Point-in-time view of the room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayStatus {
    pub room: String,
    pub members: usize,
    pub squares: Vec<Square>,
}

pub struct Relay {
    room: Room,
    store: SquareStore,
    owners: HashMap<ConnectionId, SquareHash>,
    physics: Box<dyn Physics>,
    echo_corrections: bool,
}

impl Relay {
    pub fn new(room: impl Into<String>, physics: Box<dyn Physics>, echo_corrections: bool) -> Self {
        Self {
            room: Room::new(room),
            store: SquareStore::new(),
            owners: HashMap::new(),
            physics,
            echo_corrections,
        }
    }

    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self::new(cfg.room.clone(), Box::new(cfg.gravity()), cfg.echo_corrections)
    }

    pub fn store(&self) -> &SquareStore {
        &self.store
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Hash owned by `conn`, if it is live.
    pub fn hash_of(&self, conn: ConnectionId) -> Option<&SquareHash> {
        self.owners.get(&conn)
    }

    /// Creates and registers a square for `conn`, then sends it `joined`.
    pub fn connect(&mut self, conn: ConnectionId, outbox: Outbox) -> Square {
        let square = Square::spawn(conn, &mut rand::thread_rng());

        self.store.upsert(square.clone());
        self.owners.insert(conn, square.hash.clone());
        self.room.join(conn, outbox);
        self.room.emit_to(conn, ServerEvent::Joined(square.clone()));

        info!(
            %conn,
            hash = %square.hash,
            x = square.x,
            color = %square.color,
            members = self.room.len(),
            "square joined"
        );
        square
    }

    /// Accepts `square` as the new state of `conn`'s square and relays it.
    ///
    /// The payload is trusted as-is apart from `hash`, which always stays the
    /// owner's. Returns the committed record, or `None` for unknown connections.
    pub fn movement(&mut self, conn: ConnectionId, mut square: Square) -> Option<Square> {
        let Some(hash) = self.owners.get(&conn) else {
            warn!(%conn, "movement from unknown connection dropped");
            return None;
        };
        if square.hash != *hash {
            debug!(%conn, claimed = %square.hash, owned = %hash, "ignoring client-supplied hash");
            square.hash = hash.clone();
        }

        // Stamps never go backwards for a hash, even for a replayed payload.
        if let Some(stored) = self.store.get(&square.hash) {
            square.last_update = square.last_update.max(stored.last_update);
        }
        let corrected = self.physics.apply(&mut square);
        if !corrected {
            square.touch();
        }
        self.store.upsert(square.clone());

        let event = ServerEvent::UpdatedMovement(square.clone());
        let delivered = if corrected && self.echo_corrections {
            self.room.broadcast(&event)
        } else {
            self.room.broadcast_except(conn, &event)
        };
        debug!(%conn, hash = %square.hash, dest_y = square.dest_y, corrected, delivered, "relayed movement");
        Some(square)
    }

    /// Drops `conn`'s square and tells the rest of the room. No-op if already gone.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<SquareHash> {
        let hash = self.owners.remove(&conn)?;
        self.room.leave(conn);
        let delivered = self.room.broadcast(&ServerEvent::Left(hash.clone()));
        self.store.remove(&hash);

        info!(%conn, %hash, delivered, members = self.room.len(), "square left");
        Some(hash)
    }

    pub fn status(&self) -> RelayStatus {
        RelayStatus {
            room: self.room.name().to_string(),
            members: self.room.len(),
            squares: self.store.snapshot(),
        }
    }

    pub fn handle(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected { conn, outbox } => {
                self.connect(conn, outbox);
            }
            RelayEvent::Movement { conn, square } => {
                self.movement(conn, square);
            }
            RelayEvent::Disconnected { conn } => {
                self.disconnect(conn);
            }
            RelayEvent::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Processes events until every handle is dropped.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RelayEvent>) {
        info!(room = %self.room.name(), "relay started");
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        info!(room = %self.room.name(), "relay stopped");
    }

    /// Moves the relay onto its own task.
    pub fn spawn(self) -> (RelayHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (tx, task)
    }
}
