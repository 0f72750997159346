//! API server using Axum
//!
//! Serves the REST endpoints and the relay WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::{ApiServerConfig, Config};
use crate::database::Database;
use crate::error::Result;
use crate::relay::RelayHub;

use super::middleware::{cors_layer, JwtAuth, RequestLogging};
use super::routes;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub jwt_auth: JwtAuth,
    pub started_at: Instant,
    pub hub: Arc<RelayHub>,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(api_config: ApiServerConfig, full_config: Config, db: Database, hub: Arc<RelayHub>) -> Self {
        let jwt_auth = JwtAuth::new(&api_config.jwt_secret);

        let state = AppState {
            db,
            config: full_config,
            jwt_auth,
            started_at: Instant::now(),
            hub,
        };

        Self {
            config: api_config,
            state,
        }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        let cors = cors_layer(&self.config.cors_origins);

        routes::create_router(self.state.clone())
            .layer(axum::middleware::from_fn(RequestLogging::log_request))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .expect("Invalid API server address");

        let router = self.build_router();

        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| crate::error::ConvoError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }
}
