//! Message handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use crate::api::middleware::AuthenticatedUser;
use crate::api::server::AppState;
use crate::error::ConvoError;
use crate::models::{MessageWithChat, SendMessageRequest, UserProfile};
use crate::repository::{ChatRepository, MessageRepository, UserRepository};

/// Persist a message into a chat.
///
/// The response carries the sender and the full chat view (members included):
/// it is exactly the payload clients hand back to the relay's `new_message`.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    if req.content.trim().is_empty() {
        return Err(ConvoError::InvalidRequest(
            "message content is required".to_string(),
        ));
    }

    let chats = ChatRepository::new(state.db.pool().clone());
    require_membership(&chats, req.chat_id, auth.user_id).await?;

    let messages = MessageRepository::new(state.db.pool().clone());
    let message = messages
        .create(req.chat_id, auth.user_id, req.content.trim())
        .await?;

    let users = UserRepository::new(state.db.pool().clone());
    let sender = users
        .find_by_id(auth.user_id)
        .await?
        .ok_or(ConvoError::UserNotFound { id: auth.user_id })?;

    let chat = chats
        .view(req.chat_id)
        .await?
        .ok_or(ConvoError::ChatNotFound { id: req.chat_id })?;

    info!(id = message.id, chat_id = req.chat_id, "Message sent");

    let response = MessageWithChat {
        id: message.id,
        content: message.content,
        sender: UserProfile::from(sender),
        chat,
        created_at: message.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// All messages of a chat, oldest first
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(chat_id): Path<i64>,
) -> Result<impl IntoResponse, ConvoError> {
    let chats = ChatRepository::new(state.db.pool().clone());
    require_membership(&chats, chat_id, auth.user_id).await?;

    let messages = MessageRepository::new(state.db.pool().clone());
    let history = messages.list_for_chat(chat_id).await?;

    Ok(Json(history))
}

/// Check the chat exists and the requester belongs to it
async fn require_membership(
    repo: &ChatRepository,
    chat_id: i64,
    user_id: i64,
) -> Result<(), ConvoError> {
    if repo.get_by_id(chat_id).await?.is_none() {
        return Err(ConvoError::ChatNotFound { id: chat_id });
    }

    if !repo.is_member(chat_id, user_id).await? {
        return Err(ConvoError::NotAMember { chat_id });
    }

    Ok(())
}
