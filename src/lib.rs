//! Transcript Relay - a real-time room relay for live speech transcripts
//!
//! Clients open a WebSocket, create or join short-lived rooms, and every
//! transcript fragment one member sends is relayed to the other members of
//! that room.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;

// Re-export main components
pub use config::*;
pub use constants::*;
