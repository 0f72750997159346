//! API server implementation
//!
//! Provides the REST endpoints and the relay WebSocket.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::ApiServer;
