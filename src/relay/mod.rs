//! Real-time message relay.
//!
//! A thin event fan-out layer over named rooms: connections announce a user
//! identity, subscribe to chat rooms, and have typing notifications and fresh
//! messages re-emitted to the other subscribers. Membership bookkeeping is the
//! only state; there is no persistence coupling, ordering guarantee, or
//! delivery acknowledgement.

pub mod events;
pub mod hub;

pub use events::{ClientEvent, ServerEvent};
pub use hub::{ConnectionId, RelayHub, Room};

/// Maximum number of events buffered per relay connection
pub const RELAY_BUFFER_SIZE: usize = 256;
