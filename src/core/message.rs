//! Wire events exchanged with relay clients
//!
//! Every frame is a JSON object discriminated by its `event` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::connection::ConnectionId;
use crate::core::room::RoomId;
use crate::error::RelayError;

/// Client-to-server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Create a room with the sender as its only member
    #[serde(alias = "createRoom")]
    Create {
        #[serde(default)]
        ack: Option<u64>,
    },

    /// Join an existing room
    #[serde(alias = "joinRoom")]
    Join {
        room_id: RoomId,
        #[serde(default)]
        ack: Option<u64>,
    },

    /// Leave a room; never acknowledged
    #[serde(alias = "leaveRoom")]
    Leave { room_id: RoomId },

    /// Relay a transcript fragment to the other members of a room
    SendTranscript { room_id: RoomId, text: String },
}

/// Server-to-client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// First frame on every connection, carries the client's own handle
    Connected { user_id: ConnectionId },

    /// Reply to a `create` or `join` that carried an `ack` id
    Ack {
        ack: u64,
        #[serde(flatten)]
        reply: AckReply,
    },

    UserJoined { user_id: ConnectionId },

    UserLeft { user_id: ConnectionId },

    ReceiveTranscript {
        user_id: ConnectionId,
        text: String,
        #[serde(with = "iso8601_millis")]
        timestamp: DateTime<Utc>,
    },
}

/// Success or failure of a request/response event, in wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<Option<RoomId>, RelayError>> for AckReply {
    fn from(result: Result<Option<RoomId>, RelayError>) -> Self {
        match result {
            Ok(room_id) => Self {
                success: true,
                room_id,
                error: None,
            },
            Err(e) => Self {
                success: false,
                room_id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

// Matches JavaScript's Date#toISOString, e.g. 2026-10-19T12:00:00.123Z
mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
