//! Error types for the storage layer.

use scrawl_protocol::{Pid, RoomCode};

/// Errors that can occur while reading or mutating rooms.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("room {0} already exists")]
    RoomExists(RoomCode),

    #[error("player {0} not found")]
    PlayerNotFound(Pid),

    /// The GM referees and cannot be placed on a team.
    #[error("player {0} is the GM and has no team")]
    GmHasNoTeam(Pid),
}
