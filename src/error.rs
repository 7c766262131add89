use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    // Room errors
    RoomNotFound,

    // Id exhaustion, poisoned state and other registry faults
    InternalFailure(String),

    // Connection errors
    ConnectionError(String),

    // Message errors
    MessageParseError(String),
    MessageTooLarge(usize),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::InternalFailure(msg) => write!(f, "Internal failure: {}", msg),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RelayError {}

// A handler that panicked while holding the relay state poisons the lock
impl<T> From<PoisonError<T>> for RelayError {
    fn from(err: PoisonError<T>) -> Self {
        RelayError::InternalFailure(format!("Relay state lock poisoned: {}", err))
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::MessageParseError(err.to_string())
    }
}

// Generic result type for the relay
pub type Result<T> = std::result::Result<T, RelayError>;
