//! The room lifecycle state machine.
//!
//! One authoritative transition table. Handlers never write
//! `room.header.state` directly; they go through [`transition`], which
//! refuses edges the table does not allow.

use scrawl_protocol::{ErrorCode, RoomState};
use scrawl_store::Room;

use crate::error::Reject;

/// Whether the lifecycle graph has an edge `from → to`.
///
/// Any state may fall back to WAITING (moderation and reset paths).
pub fn can_transition(from: RoomState, to: RoomState) -> bool {
    use RoomState::*;
    if to == Waiting {
        return true;
    }
    matches!(
        (from, to),
        (Waiting, RolePick)
            | (RolePick, Config)
            | (Config, InGame)
            | (InGame, GameEnd)
            | (GameEnd, Config)
            | (GameEnd, RolePick)
    )
}

/// Moves the room along an allowed edge, or rejects with `BAD_STATE`.
pub fn transition(room: &mut Room, to: RoomState) -> Result<(), Reject> {
    let from = room.header.state;
    if !can_transition(from, to) {
        return Err(Reject::new(
            ErrorCode::BadState,
            format!("cannot move from {from} to {to}"),
        ));
    }
    room.header.state = to;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_edges() {
        use RoomState::*;
        for (from, to) in [
            (Waiting, RolePick),
            (RolePick, Config),
            (Config, InGame),
            (InGame, GameEnd),
            (GameEnd, Config),
            (GameEnd, RolePick),
            (GameEnd, Waiting),
            (InGame, Waiting),
        ] {
            assert!(can_transition(from, to), "{from} -> {to} should be allowed");
        }
    }

    #[test]
    fn test_forbidden_edges() {
        use RoomState::*;
        for (from, to) in [
            (Waiting, Config),
            (Waiting, InGame),
            (RolePick, InGame),
            (Config, GameEnd),
            (InGame, Config),
            (InGame, RolePick),
            (GameEnd, InGame),
        ] {
            assert!(!can_transition(from, to), "{from} -> {to} should be refused");
        }
    }

    #[test]
    fn test_transition_rejects_with_bad_state() {
        let mut room = Room::new(
            scrawl_protocol::RoomCode::from("AA11"),
            scrawl_protocol::Mode::Single,
            4,
            100,
            1800,
        );
        let err = transition(&mut room, RoomState::InGame).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadState);
        assert_eq!(room.header.state, RoomState::Waiting);
    }
}
