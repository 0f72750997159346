//! User handlers: registration, login, guest login, and search

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::api::middleware::AuthenticatedUser;
use crate::api::server::AppState;
use crate::error::ConvoError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User, UserProfile};
use crate::repository::UserRepository;

/// Query parameters for user search
#[derive(Debug, Deserialize, Default)]
pub struct SearchUsersQuery {
    pub search: Option<String>,
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ConvoError::InvalidRequest(
            "name, email and password are required".to_string(),
        ));
    }

    if let Some(ref avatar_url) = req.avatar_url {
        Url::parse(avatar_url).map_err(|_| {
            ConvoError::InvalidRequest("avatar_url must be a valid URL".to_string())
        })?;
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)?;

    let repo = UserRepository::new(state.db.pool().clone());
    let user = repo
        .create(
            req.name.trim(),
            req.email.trim(),
            &password_hash,
            req.avatar_url.as_deref(),
        )
        .await?;

    info!(id = user.id, email = %user.email, "User registered");

    let response = auth_response(&state, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handle login request
///
/// Logging in with the configured guest email takes the guest path and
/// bypasses password verification.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ConvoError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ConvoError::InvalidRequest(
            "email and password are required".to_string(),
        ));
    }

    if req.email == state.config.guest.email {
        let user = ensure_guest_user(&state).await?;
        info!(id = user.id, "Guest login via login endpoint");
        return Ok(Json(auth_response(&state, user)?));
    }

    let repo = UserRepository::new(state.db.pool().clone());
    let user = match repo.find_by_email(&req.email).await? {
        Some(user) => user,
        None => {
            warn!(email = %req.email, "Login failed: unknown email");
            return Err(ConvoError::InvalidCredentials);
        }
    };

    if !bcrypt::verify(&req.password, &user.password_hash)? {
        warn!(id = user.id, "Login failed: wrong password");
        return Err(ConvoError::InvalidCredentials);
    }

    info!(id = user.id, "User logged in");
    Ok(Json(auth_response(&state, user)?))
}

/// Guest login: lazily create (or reuse) the shared guest account
pub async fn guest_login(State(state): State<AppState>) -> Result<impl IntoResponse, ConvoError> {
    let user = ensure_guest_user(&state).await?;
    info!(id = user.id, "Guest login");
    Ok(Json(auth_response(&state, user)?))
}

/// Search users by name or email, excluding the requester
pub async fn search_users(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Query(query): Query<SearchUsersQuery>,
) -> Result<impl IntoResponse, ConvoError> {
    let repo = UserRepository::new(state.db.pool().clone());
    let users = repo.search(query.search.as_deref(), auth.user_id).await?;

    Ok(Json(users))
}

/// Get the shared guest account, creating it on first use
async fn ensure_guest_user(state: &AppState) -> Result<User, ConvoError> {
    let guest = &state.config.guest;
    let repo = UserRepository::new(state.db.pool().clone());

    if let Some(user) = repo.find_by_email(&guest.email).await? {
        return Ok(user);
    }

    let password_hash = bcrypt::hash(&guest.password, bcrypt::DEFAULT_COST)?;
    repo.ensure_guest(&guest.name, &guest.email, &password_hash, &guest.avatar_url)
        .await
}

/// Issue a token and assemble the shared auth response shape
fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, ConvoError> {
    let expiry_hours = state.config.api.token_expiry_hours;
    let token = state
        .jwt_auth
        .generate_token(user.id, expiry_hours)
        .map_err(|_| ConvoError::AuthenticationFailed)?;

    Ok(AuthResponse {
        user: UserProfile::from(user),
        token,
        expires_in: expiry_hours * 3600,
    })
}
