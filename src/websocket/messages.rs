//! WebSocket Message Types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notifications::{Notification, NotificationEvent, NotificationSnapshot};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Dismiss a visible toast
    Dismiss { id: Uuid },
    /// Close the modal
    DismissModal,
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected { connection_id: String },
    /// Full presentation state
    Snapshot {
        toasts: Vec<Notification>,
        modal: Option<Notification>,
        pending: usize,
    },
    /// A scheduler state change
    Event { event: NotificationEvent },
    /// The client fell behind and missed `skipped` events; a fresh
    /// snapshot follows
    Lagged { skipped: u64 },
    /// Pong response to ping
    Pong,
    Error { message: String },
}

impl From<NotificationSnapshot> for ServerMessage {
    fn from(snapshot: NotificationSnapshot) -> Self {
        ServerMessage::Snapshot {
            toasts: snapshot.toasts,
            modal: snapshot.modal,
            pending: snapshot.pending,
        }
    }
}

impl From<NotificationEvent> for ServerMessage {
    fn from(event: NotificationEvent) -> Self {
        ServerMessage::Event { event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::DismissReason;

    #[test]
    fn test_client_message_deserialize_dismiss() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type": "dismiss", "id": "{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::Dismiss { id: parsed } => assert_eq!(parsed, id),
            _ => panic!("Expected Dismiss"),
        }
    }

    #[test]
    fn test_client_message_deserialize_simple() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "dismiss_modal"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::DismissModal));
    }

    #[test]
    fn test_server_message_serialize_event() {
        let id = Uuid::new_v4();
        let msg = ServerMessage::from(NotificationEvent::ToastDismissed {
            id,
            reason: DismissReason::Expired,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"]["type"], "toast_dismissed");
        assert_eq!(json["event"]["reason"], "expired");
        assert_eq!(json["event"]["id"], id.to_string());
    }

    #[test]
    fn test_server_message_serialize_snapshot() {
        let msg = ServerMessage::from(NotificationSnapshot::default());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"snapshot\""));
        assert!(json.contains("\"modal\":null"));
    }
}
