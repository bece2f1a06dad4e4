//! Room fan-out: maps `(room, pid)` to the outbound channel of the
//! connection task that owns the socket.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use scrawl_protocol::{Pid, RoomCode};

/// Close code delivered to kicked players.
pub const KICK_CLOSE_CODE: u16 = 4001;

/// One frame queued toward a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    /// Close the socket after flushing, with an application close code.
    Close { code: u16, reason: String },
}

/// Registry of live connections, grouped by room.
///
/// The lock only guards the map; frames are pushed onto unbounded
/// channels after the guard is dropped, so a slow client never stalls a
/// broadcast.
#[derive(Default)]
pub struct Registry {
    rooms: Mutex<HashMap<RoomCode, HashMap<Pid, mpsc::UnboundedSender<Outbound>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection's outbound channel. A reconnect replaces the
    /// previous channel; the stale writer task ends when its receiver
    /// drops.
    pub fn register(&self, room: &RoomCode, pid: &Pid, tx: mpsc::UnboundedSender<Outbound>) {
        let mut rooms = self.lock();
        rooms
            .entry(room.clone())
            .or_default()
            .insert(pid.clone(), tx);
    }

    /// Drops a connection's channel; removes the room entry once empty.
    pub fn unregister(&self, room: &RoomCode, pid: &Pid) {
        let mut rooms = self.lock();
        if let Some(conns) = rooms.get_mut(room) {
            conns.remove(pid);
            if conns.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Queues a frame for one player, if connected.
    pub fn send_to(&self, room: &RoomCode, pid: &Pid, frame: Outbound) {
        let tx = {
            let rooms = self.lock();
            rooms.get(room).and_then(|conns| conns.get(pid).cloned())
        };
        if let Some(tx) = tx {
            let _ = tx.send(frame);
        }
    }

    /// Queues a text frame for every connection in the room, or only
    /// for `targets` when given.
    pub fn broadcast(&self, room: &RoomCode, targets: Option<&[Pid]>, text: &str) {
        let txs: Vec<_> = {
            let rooms = self.lock();
            match rooms.get(room) {
                None => return,
                Some(conns) => match targets {
                    None => conns.values().cloned().collect(),
                    Some(pids) => pids
                        .iter()
                        .filter_map(|pid| conns.get(pid).cloned())
                        .collect(),
                },
            }
        };
        for tx in txs {
            let _ = tx.send(Outbound::Text(text.to_string()));
        }
    }

    /// Queues a kick close frame and unbinds the player's channel.
    pub fn close_pid(&self, room: &RoomCode, pid: &Pid, reason: &str) {
        self.send_to(
            room,
            pid,
            Outbound::Close { code: KICK_CLOSE_CODE, reason: reason.to_string() },
        );
        self.unregister(room, pid);
        debug!(%room, %pid, "connection closed by moderation");
    }

    pub fn connection_count(&self, room: &RoomCode) -> usize {
        self.lock().get(room).map_or(0, HashMap::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RoomCode, HashMap<Pid, mpsc::UnboundedSender<Outbound>>>> {
        match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
