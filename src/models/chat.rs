use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::message::MessageView;
use super::user::UserProfile;

/// Chat entity (direct and group chats share a row shape)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: i64,
    pub name: Option<String>,
    pub is_group: bool,
    pub admin_id: Option<i64>,
    pub latest_message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chat with members, group admin, and latest message populated.
///
/// This is the shape every chat endpoint returns, and the shape the relay
/// sees inside a `new_message` payload (the member list drives fan-out).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatView {
    pub id: i64,
    pub name: Option<String>,
    pub is_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<UserProfile>,
    pub members: Vec<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<MessageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Find-or-create a one-to-one chat with another user
#[derive(Debug, Deserialize)]
pub struct AccessChatRequest {
    pub user_id: i64,
}

/// Create a group chat
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub user_ids: Vec<i64>,
}

/// Rename a group chat
#[derive(Debug, Deserialize)]
pub struct RenameGroupRequest {
    pub chat_id: i64,
    pub name: String,
}

/// Add or remove a group member
#[derive(Debug, Deserialize)]
pub struct MemberUpdateRequest {
    pub chat_id: i64,
    pub user_id: i64,
}
