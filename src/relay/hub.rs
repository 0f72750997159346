//! Connection and room bookkeeping for the relay.
//!
//! State is in-process and ephemeral: a restart drops every membership, and
//! clients re-announce themselves on reconnect. Per-connection buffers are
//! bounded; a full buffer drops the event rather than blocking the emitter.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use super::events::ServerEvent;
use super::RELAY_BUFFER_SIZE;

/// Identifier for a single relay connection
pub type ConnectionId = u64;

/// A named subscription group within the relay.
///
/// Rooms are namespaced so integer user and chat identifiers cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Room(String);

impl Room {
    /// The personal room a connection joins on `setup`
    pub fn user(id: i64) -> Self {
        Room(format!("user:{}", id))
    }

    /// The shared room for a chat's open conversations
    pub fn chat(id: i64) -> Self {
        Room(format!("chat:{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Connection {
    tx: mpsc::Sender<ServerEvent>,
    rooms: HashSet<Room>,
}

/// Registry of live relay connections and the rooms they subscribe to.
///
/// Invariant: every method holds at most one map guard at a time (room
/// membership is collected into a local before any send), so concurrent
/// joins, emits, and disconnects cannot deadlock across shards.
pub struct RelayHub {
    connections: DashMap<ConnectionId, Connection>,
    rooms: DashMap<Room, HashSet<ConnectionId>>,
    next_id: AtomicU64,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new connection, returning its id and the receiver the
    /// socket's send half drains.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(RELAY_BUFFER_SIZE);

        self.connections.insert(
            id,
            Connection {
                tx,
                rooms: HashSet::new(),
            },
        );

        (id, rx)
    }

    /// Drop a connection and leave all of its rooms
    pub fn unregister(&self, conn: ConnectionId) {
        let rooms = match self.connections.remove(&conn) {
            Some((_, connection)) => connection.rooms,
            None => return,
        };

        for room in rooms {
            let now_empty = match self.rooms.get_mut(&room) {
                Some(mut members) => {
                    members.remove(&conn);
                    members.is_empty()
                }
                None => false,
            };

            if now_empty {
                // Re-checked under the entry lock: a join may have raced in
                self.rooms.remove_if(&room, |_, members| members.is_empty());
                debug!(room = %room, "Removed empty room");
            }
        }
    }

    /// Subscribe a connection to a room, creating the room on first member
    pub fn join(&self, conn: ConnectionId, room: Room) {
        {
            let mut connection = match self.connections.get_mut(&conn) {
                Some(connection) => connection,
                None => return,
            };
            connection.rooms.insert(room.clone());
        }

        debug!(conn = conn, room = %room, "Joined room");
        self.rooms.entry(room).or_default().insert(conn);
    }

    /// Send an event to a single connection
    pub fn emit_to_connection(&self, conn: ConnectionId, event: &ServerEvent) {
        let tx = match self.connections.get(&conn) {
            Some(connection) => connection.tx.clone(),
            None => return,
        };

        if tx.try_send(event.clone()).is_err() {
            debug!(conn = conn, "Relay buffer full, dropping event");
        }
    }

    /// Send an event to every member of a room, optionally skipping one
    /// connection (the sender of the event being relayed)
    pub fn emit_to_room(&self, room: &Room, except: Option<ConnectionId>, event: &ServerEvent) {
        let members: Vec<ConnectionId> = match self.rooms.get(room) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };

        for conn in members {
            if Some(conn) == except {
                continue;
            }
            self.emit_to_connection(conn, event);
        }
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of members currently in a room
    pub fn room_size(&self, room: &Room) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_emit_to_connection() {
        let hub = RelayHub::new();
        let (conn, mut rx) = hub.register();

        hub.emit_to_connection(conn, &ServerEvent::Connected);

        assert!(matches!(rx.recv().await, Some(ServerEvent::Connected)));
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_emit_to_room_skips_sender() {
        let hub = RelayHub::new();
        let (a, mut rx_a) = hub.register();
        let (b, mut rx_b) = hub.register();
        let (c, mut rx_c) = hub.register();

        let room = Room::chat(1);
        hub.join(a, room.clone());
        hub.join(b, room.clone());
        hub.join(c, room.clone());

        hub.emit_to_room(&room, Some(a), &ServerEvent::Typing { chat_id: 1 });

        assert!(matches!(
            rx_b.recv().await,
            Some(ServerEvent::Typing { chat_id: 1 })
        ));
        assert!(matches!(
            rx_c.recv().await,
            Some(ServerEvent::Typing { chat_id: 1 })
        ));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_to_missing_room_is_a_noop() {
        let hub = RelayHub::new();
        let (_conn, mut rx) = hub.register();

        hub.emit_to_room(&Room::chat(99), None, &ServerEvent::Typing { chat_id: 99 });

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_user_and_chat_rooms_do_not_collide() {
        let hub = RelayHub::new();
        let (a, mut rx_a) = hub.register();
        let (b, mut rx_b) = hub.register();

        hub.join(a, Room::user(5));
        hub.join(b, Room::chat(5));

        hub.emit_to_room(&Room::user(5), None, &ServerEvent::Connected);

        assert!(matches!(rx_a.recv().await, Some(ServerEvent::Connected)));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_leaves_all_rooms() {
        let hub = RelayHub::new();
        let (a, _rx_a) = hub.register();
        let (b, mut rx_b) = hub.register();

        let room = Room::chat(1);
        hub.join(a, room.clone());
        hub.join(a, Room::user(7));
        hub.join(b, room.clone());

        hub.unregister(a);

        assert_eq!(hub.connection_count(), 1);
        assert_eq!(hub.room_size(&room), 1);
        assert_eq!(hub.room_size(&Room::user(7)), 0);

        // Emitting after the disconnect reaches only the remaining member
        hub.emit_to_room(&room, None, &ServerEvent::StopTyping { chat_id: 1 });
        assert!(matches!(
            rx_b.recv().await,
            Some(ServerEvent::StopTyping { chat_id: 1 })
        ));
    }

    #[tokio::test]
    async fn test_full_buffer_drops_instead_of_blocking() {
        let hub = RelayHub::new();
        let (conn, mut rx) = hub.register();

        for _ in 0..(RELAY_BUFFER_SIZE + 10) {
            hub.emit_to_connection(conn, &ServerEvent::Connected);
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }

        assert_eq!(received, RELAY_BUFFER_SIZE);
    }

    #[tokio::test]
    async fn test_join_unknown_connection_is_ignored() {
        let hub = RelayHub::new();
        hub.join(999, Room::chat(1));
        assert_eq!(hub.room_size(&Room::chat(1)), 0);
    }
}
