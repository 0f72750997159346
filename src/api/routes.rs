//! API route definitions

use axum::routing::{get, post, put};
use axum::{Extension, Router};

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the API router with all routes
///
/// Registration, login, and the relay socket are public; every other
/// endpoint is protected by the bearer-token extractor.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(handlers::health::status))
        // Users
        .route(
            "/user",
            post(handlers::user::register).get(handlers::user::search_users),
        )
        .route("/user/login", post(handlers::user::login))
        .route("/user/guest-login", post(handlers::user::guest_login))
        // Chats
        .route(
            "/chat",
            post(handlers::chat::access_chat).get(handlers::chat::list_chats),
        )
        .route("/chat/group", post(handlers::chat::create_group))
        .route("/chat/rename", put(handlers::chat::rename_group))
        .route("/chat/groupadd", put(handlers::chat::add_to_group))
        .route("/chat/groupremove", put(handlers::chat::remove_from_group))
        // Messages
        .route("/message", post(handlers::message::send_message))
        .route("/message/:chat_id", get(handlers::message::list_messages));

    Router::new()
        // Health check (no auth required)
        .route("/health", get(handlers::health::health_check))
        // Relay socket (identity arrives via the setup event)
        .route("/ws/chat", get(websocket::chat::chat_ws))
        .nest("/api", api)
        .layer(Extension(state.jwt_auth.clone()))
        .with_state(state)
}
