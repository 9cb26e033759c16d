//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::notifications::{NotificationEvent, NotificationScheduler, NotificationSnapshot};

/// Notifications a client already received in a snapshot
///
/// The subscription opens before the snapshot is taken, so a change landing
/// in between is in both. The matching `*_shown` event is dropped once.
#[derive(Debug, Default)]
struct Delivered(HashSet<Uuid>);

impl Delivered {
    fn from_snapshot(snapshot: &NotificationSnapshot) -> Self {
        Self(
            snapshot
                .toasts
                .iter()
                .chain(snapshot.modal.as_ref())
                .map(|n| n.id)
                .collect(),
        )
    }

    fn is_duplicate(&mut self, event: &NotificationEvent) -> bool {
        match event {
            NotificationEvent::ToastShown { notification }
            | NotificationEvent::ModalShown { notification } => self.0.remove(&notification.id),
            NotificationEvent::ToastDismissed { id, .. } | NotificationEvent::ModalDismissed { id } => {
                self.0.remove(id);
                false
            }
            NotificationEvent::Reset => {
                self.0.clear();
                false
            }
        }
    }
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let scheduler = state.scheduler.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, scheduler))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, scheduler: NotificationScheduler) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so no change falls between them
    let mut events = scheduler.subscribe();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let _ = tx.send(ServerMessage::Connected {
        connection_id: connection_id.clone(),
    });
    let snapshot = scheduler.snapshot().await;
    let mut delivered = Delivered::from_snapshot(&snapshot);
    let _ = tx.send(snapshot.into());

    tracing::debug!(connection_id = %connection_id, "WebSocket connected");

    // Task to forward queued messages to the socket
    let conn_id_for_send = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_for_send,
                            "WebSocket send failed, closing connection"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
            }
        }
    });

    // Task to relay scheduler events
    let scheduler_for_events = scheduler.clone();
    let tx_for_events = tx.clone();
    let mut event_task = tokio::spawn(async move {
        loop {
            let msg = match events.recv().await {
                Ok(event) if delivered.is_duplicate(&event) => continue,
                Ok(event) => ServerMessage::from(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    if tx_for_events.send(ServerMessage::Lagged { skipped }).is_err() {
                        break;
                    }
                    let snapshot = scheduler_for_events.snapshot().await;
                    delivered = Delivered::from_snapshot(&snapshot);
                    snapshot.into()
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if tx_for_events.send(msg).is_err() {
                break;
            }
        }
    });

    // Task to receive client messages
    let conn_id_for_recv = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&scheduler, &tx, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            event_task.abort();
            recv_task.abort();
        }
        _ = &mut event_task => {
            send_task.abort();
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
            event_task.abort();
        }
    }

    tracing::debug!(connection_id = %connection_id, "WebSocket disconnected");
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(
    scheduler: &NotificationScheduler,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    connection_id: &str,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_client_message(scheduler, tx, client_msg).await,
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    let _ = tx.send(ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    });
                }
            }
            true
        }
        Message::Binary(_) => {
            let _ = tx.send(ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            });
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
///
/// State changes echo back through the event stream, so only failures and
/// pings get a direct reply.
async fn handle_client_message(
    scheduler: &NotificationScheduler,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Dismiss { id } => {
            if !scheduler.dismiss(id).await {
                let _ = tx.send(ServerMessage::Error {
                    message: format!("Toast {} not found", id),
                });
            }
        }
        ClientMessage::DismissModal => {
            scheduler.dismiss_modal().await;
        }
        ClientMessage::Ping => {
            let _ = tx.send(ServerMessage::Pong);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{Achievement, AchievementEvent, Rarity};

    fn recv_now(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
        rx.try_recv().expect("expected a queued message")
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let scheduler = NotificationScheduler::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let keep_open = handle_ws_message(
            &scheduler,
            &tx,
            "c1",
            Message::Text(r#"{"type": "ping"}"#.to_string()),
        )
        .await;

        assert!(keep_open);
        assert!(matches!(recv_now(&mut rx), ServerMessage::Pong));
    }

    #[tokio::test]
    async fn test_invalid_message_keeps_connection() {
        let scheduler = NotificationScheduler::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let keep_open =
            handle_ws_message(&scheduler, &tx, "c1", Message::Text("nonsense".to_string())).await;

        assert!(keep_open);
        assert!(matches!(recv_now(&mut rx), ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_close_ends_connection() {
        let scheduler = NotificationScheduler::default();
        let (tx, _rx) = mpsc::unbounded_channel();

        assert!(!handle_ws_message(&scheduler, &tx, "c1", Message::Close(None)).await);
    }

    #[tokio::test]
    async fn test_dismiss_through_socket() {
        let scheduler = NotificationScheduler::default();
        let mut events = scheduler.subscribe();
        let outcome = scheduler
            .submit(AchievementEvent::new(Achievement::new("a", Rarity::Common)))
            .await
            .unwrap();
        let id = outcome.id().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_client_message(&scheduler, &tx, ClientMessage::Dismiss { id }).await;
        assert!(rx.try_recv().is_err());
        assert!(scheduler.snapshot().await.toasts.is_empty());

        assert!(matches!(events.recv().await.unwrap(), NotificationEvent::ToastShown { .. }));
        assert!(matches!(events.recv().await.unwrap(), NotificationEvent::ToastDismissed { .. }));

        // second dismiss of the same id is reported
        handle_client_message(&scheduler, &tx, ClientMessage::Dismiss { id }).await;
        assert!(matches!(recv_now(&mut rx), ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_events_not_repeated() {
        let scheduler = NotificationScheduler::default();
        let mut events = scheduler.subscribe();
        scheduler
            .submit(AchievementEvent::new(Achievement::new("a", Rarity::Common)))
            .await
            .unwrap();
        scheduler
            .submit(AchievementEvent::new(Achievement::new("l", Rarity::Legendary)))
            .await
            .unwrap();

        // subscribed before both changes, snapshot taken after them
        let mut delivered = Delivered::from_snapshot(&scheduler.snapshot().await);
        let toast = events.recv().await.unwrap();
        let modal = events.recv().await.unwrap();

        assert!(delivered.is_duplicate(&toast));
        assert!(delivered.is_duplicate(&modal));
        assert!(!delivered.is_duplicate(&toast));
        assert!(!delivered.is_duplicate(&NotificationEvent::Reset));
    }
}
