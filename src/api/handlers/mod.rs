//! API request handlers

pub mod chat;
pub mod health;
pub mod message;
pub mod user;
