//! Gateway wire protocol.
//!
//! The gateway speaks JSON text frames over a persistent WebSocket. The
//! client opens the connection with its credential token as a query
//! parameter, sends [`ClientMessage::Init`], and receives a
//! [`RegistrationAck`] carrying its connection id. Every later broker frame
//! is an opaque forwarded event, relayed verbatim from the ingestion body.

use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;

/// Close code sent when a connection arrives without a credential token.
pub const CLOSE_UNAUTHORIZED: u16 = 4001;

/// Close reason paired with [`CLOSE_UNAUTHORIZED`].
pub const CLOSE_UNAUTHORIZED_REASON: &str = "Unauthorized";

/// Frames the client sends to the broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Request registration; the broker answers with a [`RegistrationAck`].
    Init,
}

/// The broker's reply to [`ClientMessage::Init`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationAck {
    /// The id this connection is registered under.
    pub connection_id: ConnectionId,
}

/// Whether a decoded gateway frame has the shape of a registration ack.
///
/// Forwarded events are opaque, so the `connectionId` field is the only way
/// to recognize a late duplicate of the handshake reply and drop it instead
/// of emitting it as an event.
#[must_use]
pub fn is_registration_ack(frame: &serde_json::Value) -> bool {
    frame.get("connectionId").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_wire_shape() {
        let json = serde_json::to_string(&ClientMessage::Init).unwrap();
        assert_eq!(json, r#"{"action":"init"}"#);
        let back: ClientMessage = serde_json::from_str(r#"{"action":"init"}"#).unwrap();
        assert_eq!(back, ClientMessage::Init);
    }

    #[test]
    fn ack_wire_shape() {
        let ack = RegistrationAck {
            connection_id: ConnectionId::from("local-1"),
        };
        let json = serde_json::to_string(&ack).unwrap();
        assert_eq!(json, r#"{"connectionId":"local-1"}"#);
    }

    #[test]
    fn ack_shape_detection() {
        let ack: serde_json::Value =
            serde_json::from_str(r#"{"connectionId":"local-3"}"#).unwrap();
        assert!(is_registration_ack(&ack));

        let event: serde_json::Value =
            serde_json::from_str(r#"{"event_type":"message.received"}"#).unwrap();
        assert!(!is_registration_ack(&event));
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let parsed = serde_json::from_str::<ClientMessage>(r#"{"action":"subscribe"}"#);
        assert!(parsed.is_err());
    }
}
