//! Health and status endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;
use crate::error::ConvoError;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "convo"
        })),
    )
}

/// Service status: uptime, database latency, and live relay connections
pub async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, ConvoError> {
    let db_latency = state.db.health_check().await?;

    Ok(Json(json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "database_latency_ms": db_latency.as_millis() as u64,
        "relay_connections": state.hub.connection_count(),
    })))
}
