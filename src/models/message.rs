use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::chat::ChatView;
use super::user::UserProfile;

/// Message entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Message with its sender populated; used for chat history and as the
/// latest-message embed on [`ChatView`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub chat_id: i64,
    pub content: String,
    pub sender: UserProfile,
    pub created_at: DateTime<Utc>,
}

/// Message with sender and full chat view populated.
///
/// Returned by the send endpoint; clients hand exactly this object back to
/// the relay as the `new_message` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWithChat {
    pub id: i64,
    pub content: String,
    pub sender: UserProfile,
    pub chat: ChatView,
    pub created_at: DateTime<Utc>,
}

/// Send a message into a chat
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub content: String,
}
