//! Room membership and fan-out.
//!
//! Each member is a connection id plus its outbox. Sends never block; a
//! member whose writer has gone away is skipped.

use std::collections::HashMap;

use squares_shared::net::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;
use tracing::debug;

/// Outbound queue drained by a connection's writer task.
///
/// Unbounded, so relay sends never block. A member that stops reading keeps
/// growing its queue until it disconnects.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// Named broadcast group.
#[derive(Debug)]
pub struct Room {
    name: String,
    members: HashMap<ConnectionId, Outbox>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join(&mut self, conn: ConnectionId, outbox: Outbox) {
        self.members.insert(conn, outbox);
    }

    /// Returns false if `conn` was not a member.
    pub fn leave(&mut self, conn: ConnectionId) -> bool {
        self.members.remove(&conn).is_some()
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.members.contains_key(&conn)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sends to one member only.
    pub fn emit_to(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        match self.members.get(&conn) {
            Some(outbox) => deliver(conn, outbox, event),
            None => false,
        }
    }

    /// Sends to every member. Returns the number of successful deliveries.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.members
            .iter()
            .filter(|(conn, outbox)| deliver(**conn, outbox, event.clone()))
            .count()
    }

    /// Sends to every member except `origin`.
    pub fn broadcast_except(&self, origin: ConnectionId, event: &ServerEvent) -> usize {
        self.members
            .iter()
            .filter(|(conn, _)| **conn != origin)
            .filter(|(conn, outbox)| deliver(**conn, outbox, event.clone()))
            .count()
    }
}

fn deliver(conn: ConnectionId, outbox: &Outbox, event: ServerEvent) -> bool {
    let name = event.name();
    match outbox.send(event) {
        Ok(()) => true,
        Err(_) => {
            debug!(%conn, event = name, "outbox closed, dropping event");
            false
        }
    }
}
