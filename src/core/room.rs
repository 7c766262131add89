use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;
use std::collections::{HashMap, HashSet};

use crate::config::ServerConfig;
use crate::constants::{DEFAULT_ROOM_ID_LENGTH, DEFAULT_ROOM_ID_MAX_ATTEMPTS};
use crate::core::connection::ConnectionId;
use crate::error::{RelayError, Result};

/// Short token clients share to meet in a room
pub type RoomId = String;

const ROOM_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Source of candidate room ids; the registry rejects candidates already in use
pub trait RoomIdGenerator: Send {
    fn next_id(&mut self) -> RoomId;
}

impl<F> RoomIdGenerator for F
where
    F: FnMut() -> RoomId + Send,
{
    fn next_id(&mut self) -> RoomId {
        self()
    }
}

/// Random lowercase alphanumeric ids of a fixed length
#[derive(Debug, Clone)]
pub struct RandomRoomIds {
    length: usize,
}

impl RandomRoomIds {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomRoomIds {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_ID_LENGTH)
    }
}

impl RoomIdGenerator for RandomRoomIds {
    fn next_id(&mut self) -> RoomId {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())] as char)
            .collect()
    }
}

/// A group of connections relaying transcripts to each other
#[derive(Debug, Clone)]
pub struct Room {
    /// Unique identifier among active rooms
    pub id: RoomId,
    /// Connections currently in the room, never empty while registered
    pub members: HashSet<ConnectionId>,
    /// Timestamp of room creation
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Creates a room whose only member is its creator
    pub fn new(id: RoomId, creator: ConnectionId) -> Self {
        let mut members = HashSet::new();
        members.insert(creator);
        Self {
            id,
            members,
            created_at: Utc::now(),
        }
    }

    /// Adds a member, returning false if it was already present
    pub fn add_member(&mut self, client_id: ConnectionId) -> bool {
        self.members.insert(client_id)
    }

    /// Removes a member, returning false if it was not present
    pub fn remove_member(&mut self, client_id: &ConnectionId) -> bool {
        self.members.remove(client_id)
    }

    pub fn has_member(&self, client_id: &ConnectionId) -> bool {
        self.members.contains(client_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Every member except `client_id`
    pub fn others(&self, client_id: &ConnectionId) -> Vec<ConnectionId> {
        self.members
            .iter()
            .filter(|member| *member != client_id)
            .cloned()
            .collect()
    }
}

/// Result of a connection leaving one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_id: RoomId,
    /// Members still in the room; empty when the room was removed
    pub remaining: Vec<ConnectionId>,
}

impl Departure {
    pub fn room_removed(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Tracks every active room and which connections are in it
pub struct RoomRegistry {
    /// Map of room ID to room instance
    rooms: HashMap<RoomId, Room>,
    /// Map of client ID to set of room IDs they're in
    client_rooms: HashMap<ConnectionId, HashSet<RoomId>>,
    ids: Box<dyn RoomIdGenerator>,
    max_attempts: usize,
}

impl RoomRegistry {
    /// Creates an empty registry drawing ids from `ids`, giving up after
    /// `max_attempts` candidates that collide with active rooms
    pub fn new(ids: Box<dyn RoomIdGenerator>, max_attempts: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            client_rooms: HashMap::new(),
            ids,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Box::new(RandomRoomIds::default()),
            DEFAULT_ROOM_ID_MAX_ATTEMPTS,
        )
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            Box::new(RandomRoomIds::new(config.room_id_length)),
            config.room_id_max_attempts,
        )
    }

    /// Creates a room with `creator` as its only member and returns its id
    pub fn create_room(&mut self, creator: &ConnectionId) -> Result<RoomId> {
        let room_id = self.reserve_id()?;
        Ok(self.insert_room(room_id, creator))
    }

    /// Draws an id no active room uses. Fails once `max_attempts` candidates
    /// have all collided; the registry is left untouched either way.
    pub fn reserve_id(&mut self) -> Result<RoomId> {
        for _ in 0..self.max_attempts {
            let candidate = self.ids.next_id();
            if !self.rooms.contains_key(&candidate) {
                return Ok(candidate);
            }
            debug!("Room id {} already in use, drawing another", candidate);
        }

        Err(RelayError::InternalFailure(format!(
            "no unused room id after {} attempts",
            self.max_attempts
        )))
    }

    /// Registers a room under an id obtained from `reserve_id`.
    ///
    /// Only rooms can be removed between the two calls, so the id is still
    /// unused here.
    pub fn insert_room(&mut self, room_id: RoomId, creator: &ConnectionId) -> RoomId {
        self.rooms
            .insert(room_id.clone(), Room::new(room_id.clone(), creator.clone()));
        self.client_rooms
            .entry(creator.clone())
            .or_default()
            .insert(room_id.clone());

        info!("Room {} created by {}", room_id, creator);
        room_id
    }

    /// Adds `client_id` to an existing room.
    ///
    /// Returns the members that should hear about the join. The list is empty
    /// when the connection was already a member.
    pub fn join_room(
        &mut self,
        room_id: &str,
        client_id: &ConnectionId,
    ) -> Result<Vec<ConnectionId>> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or(RelayError::RoomNotFound)?;

        if !room.add_member(client_id.clone()) {
            return Ok(Vec::new());
        }

        self.client_rooms
            .entry(client_id.clone())
            .or_default()
            .insert(room.id.clone());

        debug!(
            "{} joined room {} ({} members)",
            client_id,
            room.id,
            room.member_count()
        );
        Ok(room.others(client_id))
    }

    /// Removes `client_id` from a room, deleting the room once it is empty.
    ///
    /// Returns `None` when the room does not exist or the connection was not
    /// a member.
    pub fn leave_room(&mut self, room_id: &str, client_id: &ConnectionId) -> Option<Departure> {
        let room = self.rooms.get_mut(room_id)?;
        if !room.remove_member(client_id) {
            return None;
        }

        if let Some(rooms_set) = self.client_rooms.get_mut(client_id) {
            rooms_set.remove(room_id);
            if rooms_set.is_empty() {
                self.client_rooms.remove(client_id);
            }
        }

        let remaining: Vec<ConnectionId> = room.members.iter().cloned().collect();
        if room.is_empty() {
            if let Some(removed) = self.rooms.remove(room_id) {
                info!(
                    "Room {} removed after its last member left ({}s old)",
                    room_id,
                    (Utc::now() - removed.created_at).num_seconds()
                );
            }
        }

        Some(Departure {
            room_id: room_id.to_string(),
            remaining,
        })
    }

    /// Removes a client from all rooms (e.g., on disconnect)
    pub fn remove_connection_everywhere(&mut self, client_id: &ConnectionId) -> Vec<Departure> {
        let mut room_ids: Vec<RoomId> = self
            .client_rooms
            .get(client_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        room_ids.sort();

        room_ids
            .iter()
            .filter_map(|room_id| self.leave_room(room_id, client_id))
            .collect()
    }

    pub fn contains_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn is_member(&self, room_id: &str, client_id: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .map(|room| room.has_member(client_id))
            .unwrap_or(false)
    }

    /// Gets all members of a room
    pub fn members(&self, room_id: &str) -> Result<Vec<ConnectionId>> {
        let room = self.rooms.get(room_id).ok_or(RelayError::RoomNotFound)?;
        Ok(room.members.iter().cloned().collect())
    }

    /// Gets all rooms a client is in
    pub fn rooms_of(&self, client_id: &ConnectionId) -> Vec<RoomId> {
        self.client_rooms
            .get(client_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Drops every room and membership; the registry stays usable
    pub fn dispose(&mut self) {
        if !self.rooms.is_empty() {
            info!("Disposing {} active rooms", self.rooms.len());
        }
        self.rooms.clear();
        self.client_rooms.clear();
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
