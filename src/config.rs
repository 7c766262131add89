//! Server configuration module
//! Handles dynamic configuration parameters for the relay server

use crate::constants::{
    DEFAULT_HOST, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT, DEFAULT_ROOM_ID_LENGTH,
    DEFAULT_ROOM_ID_MAX_ATTEMPTS, DEFAULT_STATIC_DIR, MAX_ROOM_ID_LENGTH, MIN_MESSAGE_SIZE,
    MIN_ROOM_ID_LENGTH,
};
use crate::error::{RelayError, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Server configuration parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for every path that is not a relay endpoint
    pub static_dir: String,
    /// Number of characters in a generated room id
    pub room_id_length: usize,
    /// How many ids may collide with active rooms before `create` fails
    pub room_id_max_attempts: usize,
    /// Largest accepted inbound frame, in bytes
    pub max_message_size: usize,
    /// Leave every current room before creating or joining another one
    pub single_room_membership: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            room_id_length: DEFAULT_ROOM_ID_LENGTH,
            room_id_max_attempts: DEFAULT_ROOM_ID_MAX_ATTEMPTS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            single_room_membership: false,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn flag_var(name: &str) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false)
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: env::var("RELAY_HOST").unwrap_or(DEFAULT_HOST.to_string()),
            port: parse_var("RELAY_PORT", DEFAULT_PORT),
            static_dir: env::var("RELAY_STATIC_DIR").unwrap_or(DEFAULT_STATIC_DIR.to_string()),
            room_id_length: parse_var("RELAY_ROOM_ID_LENGTH", DEFAULT_ROOM_ID_LENGTH),
            room_id_max_attempts: parse_var(
                "RELAY_ROOM_ID_MAX_ATTEMPTS",
                DEFAULT_ROOM_ID_MAX_ATTEMPTS,
            ),
            max_message_size: parse_var("RELAY_MAX_MESSAGE_SIZE", DEFAULT_MAX_MESSAGE_SIZE),
            single_room_membership: flag_var("RELAY_SINGLE_ROOM"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ROOM_ID_LENGTH..=MAX_ROOM_ID_LENGTH).contains(&self.room_id_length) {
            return Err(RelayError::ConfigError(format!(
                "room id length must be between {} and {}, got {}",
                MIN_ROOM_ID_LENGTH, MAX_ROOM_ID_LENGTH, self.room_id_length
            )));
        }

        if self.room_id_max_attempts == 0 {
            return Err(RelayError::ConfigError(
                "room id attempts must be at least 1".to_string(),
            ));
        }

        if self.max_message_size < MIN_MESSAGE_SIZE {
            return Err(RelayError::ConfigError(format!(
                "max message size must be at least {} bytes, got {}",
                MIN_MESSAGE_SIZE, self.max_message_size
            )));
        }

        Ok(())
    }

    /// Address the HTTP/WebSocket listener binds to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                RelayError::ConfigError(format!(
                    "invalid listen address {}:{}: {}",
                    self.host, self.port, e
                ))
            })
    }
}
