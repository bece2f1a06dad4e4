//! Client-to-server commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Mode, Pid, Team, Vote};

fn default_cap() -> u32 {
    8
}

/// A moderation verb carried by [`ClientCommand::Moderation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModAction {
    Warn,
    Mute,
    Kick,
}

/// Everything a client may send, tagged by a `type` field:
///
/// ```json
/// {"type": "guess", "text": "lighthouse"}
/// ```
///
/// Unknown `type` values fail to deserialize; the dispatcher answers those
/// with a `BAD_MESSAGE` error rather than closing the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Create a room and become its GM.
    CreateRoom {
        mode: Mode,
        #[serde(default = "default_cap")]
        cap: u32,
    },
    /// Join an existing room by the code in the connection path.
    Join { name: String },
    /// Leave the room voluntarily.
    Leave,
    /// Liveness ping; also refreshes the room TTL.
    Heartbeat,
    /// Request a full (redacted) room snapshot.
    Snapshot,
    /// Resume a previous identity after a dropped connection.
    Reconnect {
        #[serde(default)]
        pid: Option<Pid>,
    },
    /// Pick or switch VS team while in the lobby.
    SetTeam { team: Team },
    /// GM: move the lobby into role assignment.
    StartRolePick,
    /// GM: pick drawers (VS) or accept the seeded assignment.
    AssignRoles {
        #[serde(default, rename = "drawerA")]
        drawer_a: Option<Pid>,
        #[serde(default, rename = "drawerB")]
        drawer_b: Option<Pid>,
    },
    /// GM: configure a SINGLE-mode round.
    SetRoundConfig {
        secret_word: String,
        stroke_limit: u32,
        time_limit_sec: u64,
    },
    /// GM: configure a VS-mode game.
    SetVsConfig {
        secret_word: String,
        draw_window_sec: u64,
        guess_window_sec: u64,
        strokes_per_phase: u32,
        max_rounds: u32,
    },
    /// GM: start the configured game, optionally after a countdown.
    StartGame {
        #[serde(default)]
        countdown_sec: Option<u64>,
    },
    /// Drawer: submit a stroke. `canvas` is required in VS mode.
    DrawOp {
        op: Value,
        #[serde(default)]
        canvas: Option<Team>,
    },
    /// Guesser: submit a guess at the secret word.
    Guess { text: String },
    /// GM (SINGLE): toggle between the DRAW and GUESS phases.
    PhaseTick,
    /// VS drawer: spend a stroke to scribble on the enemy canvas.
    Sabotage { target: Team, op: Value },
    /// Cast a ballot in the post-game continue vote.
    VoteNext {
        #[serde(default)]
        vote: Vote,
    },
    /// GM (VS): cut the current round short.
    EndRound,
    /// GM: end the game immediately with no winner.
    EndGame,
    /// GM: warn, mute, or kick a player.
    Moderation {
        action: ModAction,
        target: Pid,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        duration_sec: Option<u64>,
    },
}
