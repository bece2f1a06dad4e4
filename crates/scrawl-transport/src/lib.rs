//! WebSocket plumbing for Scrawl.
//!
//! Two halves: the listener side ([`WsListener`] and split connections)
//! and the fan-out side ([`Registry`]), which maps `(room, pid)` to the
//! outbound channel of the task that owns each socket. Delivery and
//! game logic never touch the same lock.
//!
//! # Feature flags
//!
//! - `websocket` (default): the `tokio-tungstenite` listener. The
//!   registry has no socket dependency and is always available.

mod error;
mod registry;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use registry::{KICK_CLOSE_CODE, Outbound, Registry};
#[cfg(feature = "websocket")]
pub use websocket::{WsConnection, WsListener, WsReceiver, WsSender};

use std::fmt;

/// Opaque identifier for an accepted connection, used only in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }
}
