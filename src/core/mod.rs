//! Core functionality for the relay server

pub mod connection;
pub mod message;
pub mod message_handler;
pub mod room;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use connection::{Connection, ConnectionId};
pub use message::{AckReply, ClientEvent, ServerEvent};
pub use message_handler::MessageHandler;
pub use room::{Departure, RandomRoomIds, Room, RoomId, RoomIdGenerator, RoomRegistry};
pub use server::{RelayServer, SharedRelayServer};
pub use session::SessionManager;
