//! WebSocket connection management
//! Handles the identity and outbound channel of client connections

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::message::ServerEvent;

/// Opaque handle for one connected client, unique per live session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Allocate a fresh handle for a newly upgraded socket
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Represents the state of a single WebSocket connection
pub struct Connection {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<ServerEvent>,
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id,
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Queue an event for this connection's writer task
    pub fn send(&self, event: ServerEvent) -> bool {
        match self.sender.send(event) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send event to client {}", self.id);
                false
            }
        }
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
