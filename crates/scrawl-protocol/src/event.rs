//! Server-to-client events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ErrorCode, Mode, Phase, Pid, RoomCode, RoomState, Team};

/// How a continue vote resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    Passed,
    Failed,
}

/// Everything the server pushes, tagged by a `type` field.
///
/// Snapshot-shaped payloads (`room`, `players`, `game`, ...) are carried as
/// raw JSON documents: their shape is owned by the store models, and keeping
/// them untyped here keeps the protocol crate a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A command was rejected. Never closes the connection.
    Error { code: ErrorCode, message: String },
    /// Full room view, redacted per viewer (the secret word is omitted for
    /// everyone but the GM and drawers until the game ends).
    RoomSnapshot {
        room: Value,
        players: Vec<Value>,
        roles: BTreeMap<String, Pid>,
        round_config: Value,
        game: Value,
        ops: Vec<Value>,
        modlog: Vec<Value>,
    },
    /// Answer to `create_room`; also tells the creator their pid.
    RoomCreated {
        room_code: RoomCode,
        mode: Mode,
        pid: Pid,
    },
    PlayerJoined { pid: Pid, name: String },
    PlayerLeft { pid: Pid },
    /// A stroke accepted onto a canvas, relayed to the whole room.
    OpBroadcast {
        op: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canvas: Option<Team>,
        by: Pid,
    },
    RoomStateChanged { state: RoomState },
    PhaseChanged { phase: Phase, round_no: u32 },
    /// A pre-game countdown is running; the game starts at `end_at`.
    CountdownStarted { end_at: u64 },
    /// Outcome of one guess. `team` is set in VS mode.
    GuessResult {
        correct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<Team>,
        text: String,
        by: Pid,
    },
    /// Wrong SINGLE-mode guesses double as chat lines.
    GuessChat {
        ts: u64,
        pid: Pid,
        name: String,
        text: String,
    },
    /// Remaining stroke budget after a spend or refill. Keys are team
    /// letters in VS mode, `"pool"` in SINGLE mode.
    BudgetUpdate { budget: BTreeMap<String, u32> },
    SabotageUsed {
        by: Pid,
        target: Team,
        cooldown_until: u64,
    },
    /// A VS round resolved without ending the game.
    RoundEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<Team>,
        round_no: u32,
    },
    /// The game resolved; the secret word is revealed.
    GameEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<Team>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner_pid: Option<Pid>,
        word: String,
        game_no: u32,
        round_no: u32,
        reason: String,
    },
    VoteProgress { yes: u32, no: u32, eligible: u32 },
    VoteResolved {
        outcome: VoteOutcome,
        yes: u32,
        eligible: u32,
    },
    /// Role map after assignment, e.g. `{"gm": "p-1", "drawer_a": "p-2"}`.
    RolesAssigned { roles: BTreeMap<String, Pid> },
    /// One player's public record changed (warning, mute, points, ...).
    PlayerUpdated { player: Value },
    PlayerKicked { pid: Pid, reason: String },
    ModlogEntry { entry: Value },
    TeamsUpdated { teams: BTreeMap<Team, Vec<Pid>> },
}

impl ServerEvent {
    /// Shorthand for an [`ServerEvent::Error`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerEvent::Error { code, message: message.into() }
    }
}

/// A [`ServerEvent`] addressed within a room.
///
/// `targets: None` means "every connected player"; `Some(pids)` restricts
/// delivery, which lets the engine send per-viewer redacted snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    pub event: ServerEvent,
    pub targets: Option<Vec<Pid>>,
}

impl RoomEvent {
    /// Broadcast to everyone in the room.
    pub fn all(event: ServerEvent) -> Self {
        RoomEvent { event, targets: None }
    }

    /// Deliver only to the given players.
    pub fn only(targets: Vec<Pid>, event: ServerEvent) -> Self {
        RoomEvent { event, targets: Some(targets) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_shape() {
        let ev = ServerEvent::error(ErrorCode::NotGm, "only the GM can do that");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "NOT_GM");
        assert_eq!(json["message"], "only the GM can do that");
    }

    #[test]
    fn test_optional_fields_are_omitted_when_none() {
        let ev = ServerEvent::GuessResult {
            correct: false,
            team: None,
            text: "boat".into(),
            by: Pid::from("p-3"),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json.get("team").is_none());
    }

    #[test]
    fn test_teams_updated_uses_letter_keys() {
        let mut teams = BTreeMap::new();
        teams.insert(Team::A, vec![Pid::from("p-1")]);
        teams.insert(Team::B, vec![]);
        let json = serde_json::to_value(&ServerEvent::TeamsUpdated { teams }).unwrap();
        assert_eq!(json["teams"]["A"][0], "p-1");
        assert!(json["teams"]["B"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_room_event_targeting() {
        let ev = ServerEvent::PlayerLeft { pid: Pid::from("p-9") };
        assert!(RoomEvent::all(ev.clone()).targets.is_none());
        let scoped = RoomEvent::only(vec![Pid::from("p-1")], ev);
        assert_eq!(scoped.targets.as_deref(), Some(&[Pid::from("p-1")][..]));
    }
}
