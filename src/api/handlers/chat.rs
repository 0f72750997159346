//! Chat management handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use crate::api::middleware::AuthenticatedUser;
use crate::api::server::AppState;
use crate::error::ConvoError;
use crate::models::{
    AccessChatRequest, Chat, ChatView, CreateGroupRequest, MemberUpdateRequest,
    RenameGroupRequest,
};
use crate::repository::{ChatRepository, UserRepository};

/// Find or create the one-to-one chat with another user
pub async fn access_chat(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<AccessChatRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    if req.user_id == auth.user_id {
        return Err(ConvoError::InvalidRequest(
            "cannot open a chat with yourself".to_string(),
        ));
    }

    let users = UserRepository::new(state.db.pool().clone());
    if users.find_by_id(req.user_id).await?.is_none() {
        return Err(ConvoError::UserNotFound { id: req.user_id });
    }

    let repo = ChatRepository::new(state.db.pool().clone());

    let chat = match repo.find_direct(auth.user_id, req.user_id).await? {
        Some(chat) => chat,
        None => {
            let chat = repo.create_direct(auth.user_id, req.user_id).await?;
            info!(id = chat.id, a = auth.user_id, b = req.user_id, "Opened direct chat");
            chat
        }
    };

    let view = require_view(&repo, chat.id).await?;
    Ok(Json(view))
}

/// List all chats the requester belongs to
pub async fn list_chats(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl IntoResponse, ConvoError> {
    let repo = ChatRepository::new(state.db.pool().clone());
    let chats = repo.list_for_user(auth.user_id).await?;

    Ok(Json(chats))
}

/// Create a group chat
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    if req.name.trim().is_empty() {
        return Err(ConvoError::InvalidRequest(
            "group name is required".to_string(),
        ));
    }

    let mut member_ids: Vec<i64> = req.user_ids;
    member_ids.sort_unstable();
    member_ids.dedup();
    member_ids.retain(|&id| id != auth.user_id);

    if member_ids.len() < 2 {
        return Err(ConvoError::InvalidRequest(
            "a group chat needs at least two other users".to_string(),
        ));
    }

    let repo = ChatRepository::new(state.db.pool().clone());
    let chat = repo
        .create_group(req.name.trim(), auth.user_id, &member_ids)
        .await?;

    let view = require_view(&repo, chat.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Rename a group chat
pub async fn rename_group(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<RenameGroupRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    if req.name.trim().is_empty() {
        return Err(ConvoError::InvalidRequest(
            "group name is required".to_string(),
        ));
    }

    let repo = ChatRepository::new(state.db.pool().clone());
    let chat = require_group_membership(&repo, req.chat_id, auth.user_id).await?;

    repo.rename(chat.id, req.name.trim()).await?;

    let view = require_view(&repo, chat.id).await?;
    Ok(Json(view))
}

/// Add a user to a group chat
pub async fn add_to_group(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<MemberUpdateRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    let repo = ChatRepository::new(state.db.pool().clone());
    let chat = require_group_membership(&repo, req.chat_id, auth.user_id).await?;

    let users = UserRepository::new(state.db.pool().clone());
    if users.find_by_id(req.user_id).await?.is_none() {
        return Err(ConvoError::UserNotFound { id: req.user_id });
    }

    repo.add_member(chat.id, req.user_id).await?;

    let view = require_view(&repo, chat.id).await?;
    Ok(Json(view))
}

/// Remove a user from a group chat
pub async fn remove_from_group(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<MemberUpdateRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    let repo = ChatRepository::new(state.db.pool().clone());
    let chat = require_group_membership(&repo, req.chat_id, auth.user_id).await?;

    let removed = repo.remove_member(chat.id, req.user_id).await?;
    if !removed {
        return Err(ConvoError::NotFound(format!(
            "user {} is not a member of chat {}",
            req.user_id, chat.id
        )));
    }

    let view = require_view(&repo, chat.id).await?;
    Ok(Json(view))
}

/// Load a group chat and check the requester belongs to it
async fn require_group_membership(
    repo: &ChatRepository,
    chat_id: i64,
    user_id: i64,
) -> Result<Chat, ConvoError> {
    let chat = repo
        .get_by_id(chat_id)
        .await?
        .ok_or(ConvoError::ChatNotFound { id: chat_id })?;

    if !chat.is_group {
        return Err(ConvoError::InvalidRequest(
            "not a group chat".to_string(),
        ));
    }

    if !repo.is_member(chat_id, user_id).await? {
        return Err(ConvoError::NotAMember { chat_id });
    }

    Ok(chat)
}

/// Fetch the populated view of a chat that is known to exist
async fn require_view(repo: &ChatRepository, chat_id: i64) -> Result<ChatView, ConvoError> {
    repo.view(chat_id)
        .await?
        .ok_or(ConvoError::ChatNotFound { id: chat_id })
}
