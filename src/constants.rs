// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const WS_PATH: &str = "ws";
pub const HEALTH_PATH: &str = "health";
pub const DEFAULT_STATIC_DIR: &str = "public";

// Room id generation
pub const DEFAULT_ROOM_ID_LENGTH: usize = 6;
pub const MIN_ROOM_ID_LENGTH: usize = 4;
pub const MAX_ROOM_ID_LENGTH: usize = 32;
pub const DEFAULT_ROOM_ID_MAX_ATTEMPTS: usize = 16;

// Inbound frame limits
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024;
pub const MIN_MESSAGE_SIZE: usize = 64;
