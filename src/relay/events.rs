//! Wire protocol for the relay socket.
//!
//! Events travel as JSON text frames shaped `{"event": ..., "data": ...}`.

use serde::{Deserialize, Serialize};

use crate::models::MessageWithChat;

/// Events a client may send over the relay socket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Announce identity and subscribe to the personal room
    Setup { user_id: i64 },
    /// Subscribe to a chat's room
    JoinChat { chat_id: i64 },
    /// Notify the chat's other subscribers that the user is typing
    Typing { chat_id: i64 },
    /// Clear the typing notification
    StopTyping { chat_id: i64 },
    /// Fan a freshly persisted message out to the other participants
    NewMessage { message: MessageWithChat },
}

/// Events the relay pushes to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Acknowledges a `setup`
    Connected,
    Typing { chat_id: i64 },
    StopTyping { chat_id: i64 },
    /// A message addressed to one of this connection's rooms
    MessageReceived { message: MessageWithChat },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_wire_shape() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "join_chat", "data": {"chat_id": 42}}))
                .unwrap();
        assert!(matches!(event, ClientEvent::JoinChat { chat_id: 42 }));

        let event: ClientEvent =
            serde_json::from_value(json!({"event": "setup", "data": {"user_id": 7}})).unwrap();
        assert!(matches!(event, ClientEvent::Setup { user_id: 7 }));
    }

    #[test]
    fn test_server_event_wire_shape() {
        let json = serde_json::to_value(ServerEvent::Typing { chat_id: 3 }).unwrap();
        assert_eq!(json, json!({"event": "typing", "data": {"chat_id": 3}}));

        let json = serde_json::to_value(ServerEvent::Connected).unwrap();
        assert_eq!(json["event"], "connected");
    }

    #[test]
    fn test_new_message_requires_member_list() {
        // A payload whose chat has no member list cannot be dispatched.
        let payload = json!({
            "event": "new_message",
            "data": {
                "message": {
                    "id": 1,
                    "content": "hi",
                    "sender": {"id": 7, "name": "Ada", "email": "ada@example.com", "avatar_url": null},
                    "chat": {"id": 9, "name": null, "is_group": false},
                    "created_at": "2024-01-01T00:00:00Z"
                }
            }
        });

        assert!(serde_json::from_value::<ClientEvent>(payload).is_err());
    }

    #[test]
    fn test_new_message_round_trip() {
        let payload = json!({
            "event": "new_message",
            "data": {
                "message": {
                    "id": 1,
                    "content": "hi",
                    "sender": {"id": 7, "name": "Ada", "email": "ada@example.com", "avatar_url": null},
                    "chat": {
                        "id": 9,
                        "name": null,
                        "is_group": false,
                        "members": [
                            {"id": 7, "name": "Ada", "email": "ada@example.com", "avatar_url": null},
                            {"id": 8, "name": "Bob", "email": "bob@example.com", "avatar_url": null}
                        ],
                        "created_at": "2024-01-01T00:00:00Z",
                        "updated_at": "2024-01-01T00:00:00Z"
                    },
                    "created_at": "2024-01-01T00:00:00Z"
                }
            }
        });

        let event: ClientEvent = serde_json::from_value(payload).unwrap();
        match event {
            ClientEvent::NewMessage { message } => {
                assert_eq!(message.sender.id, 7);
                assert_eq!(message.chat.members.len(), 2);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
