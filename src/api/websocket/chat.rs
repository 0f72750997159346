//! Relay WebSocket handler
//!
//! One socket per client. Incoming frames are decoded into relay events and
//! dispatched against the hub; outgoing events are drained from the
//! connection's bounded buffer. Malformed frames are logged and ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use crate::api::server::AppState;
use crate::relay::{ClientEvent, ConnectionId, RelayHub, Room, ServerEvent};

/// WebSocket handler for the chat relay
pub async fn chat_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat_ws(socket, state))
}

/// Handle a relay WebSocket connection
async fn handle_chat_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let hub = state.hub.clone();

    let (conn_id, mut rx) = hub.register();
    info!(conn = conn_id, "Relay socket connected");

    // Drain hub events into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize relay event: {}", e);
                }
            }
        }
    });

    // Decode and dispatch incoming frames
    let recv_hub = hub.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    dispatch(&recv_hub, conn_id, &text);
                }
                Ok(Message::Close(_)) => {
                    debug!(conn = conn_id, "Relay socket received close");
                    break;
                }
                Ok(Message::Ping(_)) => {
                    debug!(conn = conn_id, "Relay socket ping received");
                    // Pong is handled automatically by axum
                }
                Err(e) => {
                    debug!(conn = conn_id, "Relay socket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either direction to end
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut receive_task => {}
    }

    send_task.abort();
    receive_task.abort();
    let _ = tokio::join!(send_task, receive_task);

    hub.unregister(conn_id);
    info!(conn = conn_id, "Relay socket disconnected");
}

/// Decode one frame and apply it to the hub.
///
/// Unknown or malformed events are dropped with a debug log; the relay makes
/// no attempt to report errors back to the client.
fn dispatch(hub: &Arc<RelayHub>, conn: ConnectionId, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(conn = conn, error = %e, "Ignoring malformed relay event");
            return;
        }
    };

    match event {
        ClientEvent::Setup { user_id } => {
            hub.join(conn, Room::user(user_id));
            hub.emit_to_connection(conn, &ServerEvent::Connected);
        }
        ClientEvent::JoinChat { chat_id } => {
            hub.join(conn, Room::chat(chat_id));
        }
        ClientEvent::Typing { chat_id } => {
            hub.emit_to_room(&Room::chat(chat_id), Some(conn), &ServerEvent::Typing { chat_id });
        }
        ClientEvent::StopTyping { chat_id } => {
            hub.emit_to_room(
                &Room::chat(chat_id),
                Some(conn),
                &ServerEvent::StopTyping { chat_id },
            );
        }
        ClientEvent::NewMessage { message } => {
            // Deliver to each participant's personal room, skipping the
            // sending user entirely (all of their connections).
            let sender_id = message.sender.id;
            for member in &message.chat.members {
                if member.id == sender_id {
                    continue;
                }
                hub.emit_to_room(
                    &Room::user(member.id),
                    None,
                    &ServerEvent::MessageReceived {
                        message: message.clone(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup(hub: &Arc<RelayHub>, user_id: i64) -> (ConnectionId, tokio::sync::mpsc::Receiver<ServerEvent>) {
        let (conn, rx) = hub.register();
        dispatch(hub, conn, &json!({"event": "setup", "data": {"user_id": user_id}}).to_string());
        (conn, rx)
    }

    #[tokio::test]
    async fn test_setup_acknowledges_with_connected() {
        let hub = Arc::new(RelayHub::new());
        let (_conn, mut rx) = setup(&hub, 1);

        assert!(matches!(rx.recv().await, Some(ServerEvent::Connected)));
    }

    #[tokio::test]
    async fn test_typing_reaches_everyone_but_the_sender() {
        let hub = Arc::new(RelayHub::new());
        let (a, mut rx_a) = setup(&hub, 1);
        let (b, mut rx_b) = setup(&hub, 2);

        // Drain the connected acks
        let _ = rx_a.recv().await;
        let _ = rx_b.recv().await;

        let join = json!({"event": "join_chat", "data": {"chat_id": 9}}).to_string();
        dispatch(&hub, a, &join);
        dispatch(&hub, b, &join);

        dispatch(&hub, a, &json!({"event": "typing", "data": {"chat_id": 9}}).to_string());

        assert!(matches!(
            rx_b.recv().await,
            Some(ServerEvent::Typing { chat_id: 9 })
        ));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_message_fans_out_to_other_participants() {
        let hub = Arc::new(RelayHub::new());
        let (a, mut rx_a) = setup(&hub, 1);
        let (_b, mut rx_b) = setup(&hub, 2);
        let (_c, mut rx_c) = setup(&hub, 3);

        let _ = rx_a.recv().await;
        let _ = rx_b.recv().await;
        let _ = rx_c.recv().await;

        let payload = json!({
            "event": "new_message",
            "data": {
                "message": {
                    "id": 1,
                    "content": "hello",
                    "sender": {"id": 1, "name": "Ada", "email": "ada@example.com", "avatar_url": null},
                    "chat": {
                        "id": 9,
                        "name": null,
                        "is_group": true,
                        "members": [
                            {"id": 1, "name": "Ada", "email": "ada@example.com", "avatar_url": null},
                            {"id": 2, "name": "Bob", "email": "bob@example.com", "avatar_url": null},
                            {"id": 3, "name": "Eve", "email": "eve@example.com", "avatar_url": null}
                        ],
                        "created_at": "2024-01-01T00:00:00Z",
                        "updated_at": "2024-01-01T00:00:00Z"
                    },
                    "created_at": "2024-01-01T00:00:00Z"
                }
            }
        });

        dispatch(&hub, a, &payload.to_string());

        match rx_b.recv().await {
            Some(ServerEvent::MessageReceived { message }) => {
                assert_eq!(message.content, "hello");
                assert_eq!(message.chat.id, 9);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            rx_c.recv().await,
            Some(ServerEvent::MessageReceived { .. })
        ));

        // The sending user gets nothing, even in their personal room
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_frames_are_ignored() {
        let hub = Arc::new(RelayHub::new());
        let (conn, mut rx) = hub.register();

        dispatch(&hub, conn, "not json");
        dispatch(&hub, conn, r#"{"event": "no_such_event", "data": {}}"#);
        // A message whose chat carries no member list is dropped
        dispatch(
            &hub,
            conn,
            &json!({"event": "new_message", "data": {"message": {"id": 1}}}).to_string(),
        );

        assert!(rx.try_recv().is_err());
    }
}
