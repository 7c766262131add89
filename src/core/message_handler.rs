//! Parses client frames and routes them to the relay

use log::{debug, error};

use crate::constants::DEFAULT_MAX_MESSAGE_SIZE;
use crate::core::connection::ConnectionId;
use crate::core::message::ClientEvent;
use crate::core::server::SharedRelayServer;
use crate::error::{RelayError, Result};

/// Handles incoming client messages and routes them appropriately
#[derive(Clone)]
pub struct MessageHandler {
    server: SharedRelayServer,
    max_message_size: usize,
}

impl MessageHandler {
    pub fn new(server: SharedRelayServer) -> Self {
        Self {
            server,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn server(&self) -> &SharedRelayServer {
        &self.server
    }

    /// Decode one text frame into a client event
    pub fn parse(&self, message_text: &str) -> Result<ClientEvent> {
        if message_text.len() > self.max_message_size {
            return Err(RelayError::MessageTooLarge(message_text.len()));
        }
        Ok(serde_json::from_str(message_text)?)
    }

    /// Process a client text frame.
    ///
    /// Errors are only returned for frames that could not be understood or
    /// a broken relay state; request failures travel back in the ack.
    pub fn handle_client_message(&self, sender_id: &ConnectionId, message_text: &str) -> Result<()> {
        let event = self.parse(message_text)?;
        self.dispatch(sender_id, event)
    }

    /// Route a decoded event to the relay.
    ///
    /// `create` and `join` replies are queued by the relay itself, inside the
    /// same locked operation that applied the request.
    pub fn dispatch(&self, sender_id: &ConnectionId, event: ClientEvent) -> Result<()> {
        let outcome = match event {
            ClientEvent::Create { ack } => self.server.create_room_acked(sender_id, ack).map(drop),

            ClientEvent::Join { room_id, ack } => {
                self.server.join_room_acked(sender_id, &room_id, ack)
            }

            ClientEvent::Leave { room_id } => return self.server.leave_room(sender_id, &room_id),

            ClientEvent::SendTranscript { room_id, text } => {
                return self.server.send_transcript(sender_id, &room_id, &text).map(drop)
            }
        };

        match outcome {
            Err(RelayError::InternalFailure(msg)) => {
                error!("Request from {} failed: {}", sender_id, msg);
            }
            Err(e) => debug!("Request from {} refused: {}", sender_id, e),
            Ok(()) => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{AckReply, ServerEvent};
    use crate::core::server::RelayServer;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn setup() -> (MessageHandler, ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let handler = MessageHandler::new(Arc::new(RelayServer::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = ConnectionId::from("a");
        handler.server().connect(id.clone(), tx).unwrap();
        let _ = rx.try_recv();
        (handler, id, rx)
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let (handler, id, _rx) = setup();
        let handler = handler.with_max_message_size(64);
        let frame = format!(
            r#"{{"event":"sendTranscript","roomId":"abc123","text":"{}"}}"#,
            "x".repeat(100)
        );

        let err = handler.handle_client_message(&id, &frame).unwrap_err();
        assert!(matches!(err, RelayError::MessageTooLarge(_)));
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let (handler, id, mut rx) = setup();
        let err = handler.handle_client_message(&id, "not json").unwrap_err();
        assert!(matches!(err, RelayError::MessageParseError(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_create_without_ack_sends_nothing() {
        let (handler, id, mut rx) = setup();
        handler
            .handle_client_message(&id, r#"{"event":"create"}"#)
            .unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(handler.server().rooms_of(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_create_acknowledged_with_room_id() {
        let (handler, id, mut rx) = setup();
        handler
            .handle_client_message(&id, r#"{"event":"create","ack":3}"#)
            .unwrap();

        match rx.try_recv().unwrap() {
            ServerEvent::Ack { ack, reply } => {
                assert_eq!(ack, 3);
                assert!(reply.success);
                let room_id = reply.room_id.unwrap();
                assert!(handler.server().room_exists(&room_id).unwrap());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_join_unknown_room_acknowledged_with_error() {
        let (handler, id, mut rx) = setup();
        handler
            .handle_client_message(&id, r#"{"event":"join","roomId":"zzzzzz","ack":1}"#)
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            ServerEvent::Ack {
                ack: 1,
                reply: AckReply {
                    success: false,
                    room_id: None,
                    error: Some("Room not found".to_string()),
                },
            }
        );
    }
}
