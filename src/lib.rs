//! Convo - Real-Time Chat Server
//!
//! A real-time chat backend written in Rust.
//!
//! ## Features
//!
//! - User registration and login with bcrypt-hashed passwords and JWT sessions
//! - Guest-login fallback onto a shared, lazily created account
//! - Keyword user search
//! - One-to-one and group chats with persisted message history
//! - WebSocket relay for live message delivery and typing indicators
//! - PostgreSQL persistence with embedded migrations

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod relay;
pub mod repository;

pub use config::Config;
pub use database::Database;
pub use error::{ConvoError, Result};
