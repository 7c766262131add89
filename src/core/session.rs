use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::core::connection::{Connection, ConnectionId};
use crate::core::message::ServerEvent;

// Manages live client connections and direct per-connection delivery
pub struct SessionManager {
    connections: HashMap<ConnectionId, Connection>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    // Register a new client connection, replacing any stale entry with the same id
    pub fn register(&mut self, id: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) {
        let connection = Connection::new(id.clone(), sender);
        self.connections.insert(id, connection);
    }

    // Remove a client connection
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    // Send an event to one client; false if it is gone or its writer has stopped
    pub fn send_to(&self, id: &ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(id) {
            Some(connection) => connection.send(event),
            None => {
                log::debug!("Dropping event for unknown client {}", id);
                false
            }
        }
    }

    // Send an event to each recipient except the sender, returning the delivered count
    pub fn send_to_each<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a ConnectionId>,
        sender_id: &ConnectionId,
        event: &ServerEvent,
    ) -> usize {
        recipients
            .into_iter()
            .filter(|id| *id != sender_id)
            .filter(|id| self.send_to(id, event.clone()))
            .count()
    }

    // Get current clients count
    pub fn client_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
