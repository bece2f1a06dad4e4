//! Error types for the engine.

use scrawl_protocol::{ErrorCode, ServerEvent};
use scrawl_store::StoreError;

/// A command rejection: an error code plus a human-readable message,
/// delivered only to the offending connection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Reject {
    pub code: ErrorCode,
    pub message: String,
}

impl Reject {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Reject { code, message: message.into() }
    }

    /// The wire event carrying this rejection.
    pub fn into_event(self) -> ServerEvent {
        ServerEvent::Error { code: self.code, message: self.message }
    }
}

impl From<StoreError> for Reject {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(code) => {
                Reject::new(ErrorCode::RoomNotFound, format!("room {code} not found"))
            }
            StoreError::RoomExists(code) => {
                Reject::new(ErrorCode::BadState, format!("room {code} already exists"))
            }
            StoreError::PlayerNotFound(pid) => {
                Reject::new(ErrorCode::PlayerNotFound, format!("player {pid} not found"))
            }
            StoreError::GmHasNoTeam(_) => {
                Reject::new(ErrorCode::InvalidTarget, "the GameMaster referees and has no team")
            }
        }
    }
}
