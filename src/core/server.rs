//! Relay service that coordinates sessions and rooms
//!
//! Every operation locks the whole relay state for its duration, so one
//! handler invocation never observes another half-applied. Sends only queue
//! onto unbounded channels and never block while the lock is held.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::core::connection::ConnectionId;
use crate::core::message::{AckReply, ServerEvent};
use crate::core::room::{Departure, RoomId, RoomRegistry};
use crate::core::session::SessionManager;
use crate::error::{RelayError, Result};

struct RelayState {
    sessions: SessionManager,
    rooms: RoomRegistry,
}

impl RelayState {
    fn announce_departures(&self, client_id: &ConnectionId, departures: &[Departure]) {
        for departure in departures {
            if departure.room_removed() {
                continue;
            }
            let event = ServerEvent::UserLeft {
                user_id: client_id.clone(),
            };
            let count = self
                .sessions
                .send_to_each(&departure.remaining, client_id, &event);
            debug!(
                "Announced {} leaving room {} to {} members",
                client_id, departure.room_id, count
            );
        }
    }

    fn leave_all_rooms(&mut self, client_id: &ConnectionId) {
        let departures = self.rooms.remove_connection_everywhere(client_id);
        self.announce_departures(client_id, &departures);
    }

    fn create_room(&mut self, client_id: &ConnectionId, single_room: bool) -> Result<RoomId> {
        // Nothing may change before the id is secured
        let room_id = self.rooms.reserve_id()?;

        if single_room {
            self.leave_all_rooms(client_id);
        }

        Ok(self.rooms.insert_room(room_id, client_id))
    }

    fn join_room(
        &mut self,
        client_id: &ConnectionId,
        room_id: &str,
        single_room: bool,
    ) -> Result<()> {
        if !self.rooms.contains_room(room_id) {
            debug!("Client {} tried to join unknown room {}", client_id, room_id);
            return Err(RelayError::RoomNotFound);
        }

        if single_room && !self.rooms.is_member(room_id, client_id) {
            self.leave_all_rooms(client_id);
        }

        let others = self.rooms.join_room(room_id, client_id)?;
        let event = ServerEvent::UserJoined {
            user_id: client_id.clone(),
        };
        let count = self.sessions.send_to_each(&others, client_id, &event);
        debug!(
            "Client {} joined room {}, announced to {} members",
            client_id, room_id, count
        );

        Ok(())
    }

    fn acknowledge(
        &self,
        client_id: &ConnectionId,
        ack: Option<u64>,
        result: Result<Option<RoomId>>,
    ) {
        let Some(ack) = ack else {
            debug!("Request from {} carried no ack id, reply dropped", client_id);
            return;
        };

        let event = ServerEvent::Ack {
            ack,
            reply: AckReply::from(result),
        };
        if !self.sessions.send_to(client_id, event) {
            warn!("Failed to acknowledge request {} from {}", ack, client_id);
        }
    }
}

/// Relay logic: room lifecycle plus fan-out between room members
pub struct RelayServer {
    state: Mutex<RelayState>,
    single_room_membership: bool,
}

pub type SharedRelayServer = Arc<RelayServer>;

impl RelayServer {
    pub fn new(rooms: RoomRegistry) -> Self {
        Self {
            state: Mutex::new(RelayState {
                sessions: SessionManager::new(),
                rooms,
            }),
            single_room_membership: false,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(RoomRegistry::from_config(config))
            .with_single_room_membership(config.single_room_membership)
    }

    /// Make `create` and `join` leave every room the caller is already in
    pub fn with_single_room_membership(mut self, enabled: bool) -> Self {
        self.single_room_membership = enabled;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, RelayState>> {
        Ok(self.state.lock()?)
    }

    /// Register a connection and greet it with its own handle
    pub fn connect(
        &self,
        client_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        state.sessions.register(client_id.clone(), sender);

        let greeting = ServerEvent::Connected {
            user_id: client_id.clone(),
        };
        if !state.sessions.send_to(&client_id, greeting) {
            state.sessions.unregister(&client_id);
            return Err(RelayError::ConnectionError(format!(
                "client {} closed before greeting",
                client_id
            )));
        }

        info!(
            "Client connected: {} ({} connections)",
            client_id,
            state.sessions.client_count()
        );
        Ok(())
    }

    /// Create a room with the caller as its only member
    pub fn create_room(&self, client_id: &ConnectionId) -> Result<RoomId> {
        self.create_room_acked(client_id, None)
    }

    /// Create a room and queue the `ack` reply before the lock is released,
    /// so the reply precedes any event caused by later operations
    pub fn create_room_acked(&self, client_id: &ConnectionId, ack: Option<u64>) -> Result<RoomId> {
        let mut state = self.lock()?;

        let result = state.create_room(client_id, self.single_room_membership);
        state.acknowledge(client_id, ack, result.clone().map(Some));
        result
    }

    /// Join an existing room and announce the caller to everyone already there
    pub fn join_room(&self, client_id: &ConnectionId, room_id: &str) -> Result<()> {
        self.join_room_acked(client_id, room_id, None)
    }

    /// Join a room and queue the `ack` reply under the same lock as the join
    pub fn join_room_acked(
        &self,
        client_id: &ConnectionId,
        room_id: &str,
        ack: Option<u64>,
    ) -> Result<()> {
        let mut state = self.lock()?;

        let result = state.join_room(client_id, room_id, self.single_room_membership);
        state.acknowledge(client_id, ack, result.clone().map(|()| None));
        result
    }

    /// Leave a room; unknown rooms and non-members are ignored
    pub fn leave_room(&self, client_id: &ConnectionId, room_id: &str) -> Result<()> {
        let mut state = self.lock()?;

        match state.rooms.leave_room(room_id, client_id) {
            Some(departure) => state.announce_departures(client_id, &[departure]),
            None => debug!("Ignoring leave of room {} by non-member {}", room_id, client_id),
        }

        Ok(())
    }

    /// Relay a transcript to the other members of a room.
    ///
    /// Returns how many members it was delivered to. Transcripts from
    /// connections that are not members of the room are dropped.
    pub fn send_transcript(
        &self,
        client_id: &ConnectionId,
        room_id: &str,
        text: &str,
    ) -> Result<usize> {
        let state = self.lock()?;

        let Some(room) = state.rooms.room(room_id) else {
            debug!("Dropping transcript from {} for unknown room {}", client_id, room_id);
            return Ok(0);
        };
        if !room.has_member(client_id) {
            debug!("Dropping transcript from {}: not a member of {}", client_id, room_id);
            return Ok(0);
        }

        let event = ServerEvent::ReceiveTranscript {
            user_id: client_id.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        let count = state.sessions.send_to_each(&room.members, client_id, &event);
        debug!(
            "Relayed transcript from {} to {} members of room {}",
            client_id, count, room_id
        );

        Ok(count)
    }

    /// Remove a connection from every room and forget it. Safe to call twice.
    pub fn disconnect(&self, client_id: &ConnectionId) -> Result<()> {
        let mut state = self.lock()?;

        state.leave_all_rooms(client_id);
        if let Some(connection) = state.sessions.unregister(client_id) {
            info!(
                "Client disconnected: {} after {:?} ({} connections)",
                client_id,
                connection.connection_duration(),
                state.sessions.client_count()
            );
        }

        Ok(())
    }

    pub fn room_exists(&self, room_id: &str) -> Result<bool> {
        Ok(self.lock()?.rooms.contains_room(room_id))
    }

    pub fn room_members(&self, room_id: &str) -> Result<Vec<ConnectionId>> {
        self.lock()?.rooms.members(room_id)
    }

    pub fn rooms_of(&self, client_id: &ConnectionId) -> Result<Vec<RoomId>> {
        Ok(self.lock()?.rooms.rooms_of(client_id))
    }

    pub fn room_count(&self) -> Result<usize> {
        Ok(self.lock()?.rooms.room_count())
    }

    pub fn connection_count(&self) -> Result<usize> {
        Ok(self.lock()?.sessions.client_count())
    }

    /// Drop every room; live connections stay registered
    pub fn shutdown(&self) -> Result<()> {
        self.lock()?.rooms.dispose();
        Ok(())
    }
}

impl Default for RelayServer {
    fn default() -> Self {
        Self::new(RoomRegistry::with_defaults())
    }
}
