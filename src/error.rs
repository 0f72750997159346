use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Convo application
#[derive(Error, Debug)]
pub enum ConvoError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // User errors
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("User not found: {id}")]
    UserNotFound { id: i64 },

    // Chat errors
    #[error("Chat not found: {id}")]
    ChatNotFound { id: i64 },

    #[error("Not a member of chat {chat_id}")]
    NotAMember { chat_id: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    // Authentication errors
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Convo operations
pub type Result<T> = std::result::Result<T, ConvoError>;

impl ConvoError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ConvoError::InvalidRequest(_)
            | ConvoError::EmailTaken(_)
            | ConvoError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            ConvoError::AuthenticationFailed
            | ConvoError::InvalidCredentials
            | ConvoError::MissingAuthHeader
            | ConvoError::InvalidAuthHeader
            | ConvoError::JwtError(_) => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            ConvoError::NotAMember { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            ConvoError::UserNotFound { .. }
            | ConvoError::ChatNotFound { .. }
            | ConvoError::NotFound(_) => StatusCode::NOT_FOUND,

            // 503 Service Unavailable
            ConvoError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            ConvoError::Database(_)
            | ConvoError::PasswordHash(_)
            | ConvoError::Io(_)
            | ConvoError::MissingEnvVar(_)
            | ConvoError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Implement IntoResponse for API error responses
impl IntoResponse for ConvoError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_code_mapping() {
        assert_eq!(
            ConvoError::InvalidRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConvoError::EmailTaken("a@b.c".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConvoError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ConvoError::NotAMember { chat_id: 7 }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ConvoError::UserNotFound { id: 1 }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ConvoError::ChatNotFound { id: 1 }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ConvoError::DatabaseConnection("refused".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_client_server_helpers() {
        assert!(ConvoError::InvalidRequest("bad".to_string()).is_client_error());
        assert!(!ConvoError::InvalidRequest("bad".to_string()).is_server_error());

        assert!(ConvoError::Internal("boom".to_string()).is_server_error());
        assert!(!ConvoError::Internal("boom".to_string()).is_client_error());
    }

    #[test]
    fn test_unknown_email_and_wrong_password_share_a_message() {
        assert_eq!(
            ConvoError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
    }
}
