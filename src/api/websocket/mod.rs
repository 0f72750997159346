//! WebSocket handlers
//!
//! Relay sockets use bounded channels with try_send; a slow client drops
//! events instead of backing the emitter up.

pub mod chat;
