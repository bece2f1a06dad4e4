//! Shared identifiers and enumerations used across commands and events.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A player identifier, minted by the server on first connect and stable
/// across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub String);

impl Pid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pid {
    fn from(s: &str) -> Self {
        Pid(s.to_owned())
    }
}

/// A short join code identifying a room, e.g. `"X4QZ9A"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        RoomCode(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Game enumerations
// ---------------------------------------------------------------------------

/// Which variant of the game a room is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Cooperative: one drawer, everyone else guesses.
    Single,
    /// Competitive: two teams race on split canvases.
    Vs,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Single => f.write_str("SINGLE"),
            Mode::Vs => f.write_str("VS"),
        }
    }
}

/// One of the two VS-mode teams. Also names a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// The opposing team.
    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::A => f.write_str("A"),
            Team::B => f.write_str("B"),
        }
    }
}

/// Room lifecycle state. Transitions are enforced by the engine's FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    /// Lobby. Players join, VS players pick teams.
    Waiting,
    /// The GM is assigning drawer/guesser roles.
    RolePick,
    /// The GM is entering the secret word and round parameters.
    Config,
    /// A game is running.
    InGame,
    /// The game resolved; a continue vote may be open.
    GameEnd,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomState::Waiting => "WAITING",
            RoomState::RolePick => "ROLE_PICK",
            RoomState::Config => "CONFIG",
            RoomState::InGame => "IN_GAME",
            RoomState::GameEnd => "GAME_END",
        };
        f.write_str(s)
    }
}

/// Sub-state within `IN_GAME` (and `VOTING` within `GAME_END`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// No phase is active. Serializes as the empty string.
    #[default]
    #[serde(rename = "")]
    Idle,
    /// Drawers may submit strokes.
    Draw,
    /// Guessers may submit guesses.
    Guess,
    /// A continue vote is open.
    Voting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "",
            Phase::Draw => "DRAW",
            Phase::Guess => "GUESS",
            Phase::Voting => "VOTING",
        };
        f.write_str(s)
    }
}

/// A ballot in the post-game continue vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    #[default]
    Yes,
    No,
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Machine-readable rejection reasons carried by [`ServerEvent::Error`].
///
/// Errors are always unicast to the offending connection and never close
/// it; the only server-initiated close is a moderation kick.
///
/// [`ServerEvent::Error`]: crate::ServerEvent::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoPid,
    PlayerNotFound,
    Kicked,
    Muted,
    NotGm,
    NotDrawer,
    NotGuesser,
    NotActive,
    RoomNotFound,
    RoomFull,
    BadState,
    BadPhase,
    NotVs,
    NotSingle,
    NoBudget,
    InsufficientBudget,
    SabotageBlocked,
    StrokeTooLong,
    InvalidOp,
    InvalidLine,
    InvalidCircle,
    InvalidRadius,
    EmptyGuess,
    ConfigMissing,
    NoEligibleVoters,
    AlreadyGuessed,
    NoTeam,
    NotEnoughPlayers,
    BadMessage,
    NotImplemented,
    BadMute,
    NoDrawer,
    InvalidTarget,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The wire spelling doubles as the human-readable one.
        let s = match self {
            ErrorCode::NoPid => "NO_PID",
            ErrorCode::PlayerNotFound => "PLAYER_NOT_FOUND",
            ErrorCode::Kicked => "KICKED",
            ErrorCode::Muted => "MUTED",
            ErrorCode::NotGm => "NOT_GM",
            ErrorCode::NotDrawer => "NOT_DRAWER",
            ErrorCode::NotGuesser => "NOT_GUESSER",
            ErrorCode::NotActive => "NOT_ACTIVE",
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::BadState => "BAD_STATE",
            ErrorCode::BadPhase => "BAD_PHASE",
            ErrorCode::NotVs => "NOT_VS",
            ErrorCode::NotSingle => "NOT_SINGLE",
            ErrorCode::NoBudget => "NO_BUDGET",
            ErrorCode::InsufficientBudget => "INSUFFICIENT_BUDGET",
            ErrorCode::SabotageBlocked => "SABOTAGE_BLOCKED",
            ErrorCode::StrokeTooLong => "STROKE_TOO_LONG",
            ErrorCode::InvalidOp => "INVALID_OP",
            ErrorCode::InvalidLine => "INVALID_LINE",
            ErrorCode::InvalidCircle => "INVALID_CIRCLE",
            ErrorCode::InvalidRadius => "INVALID_RADIUS",
            ErrorCode::EmptyGuess => "EMPTY_GUESS",
            ErrorCode::ConfigMissing => "CONFIG_MISSING",
            ErrorCode::NoEligibleVoters => "NO_ELIGIBLE_VOTERS",
            ErrorCode::AlreadyGuessed => "ALREADY_GUESSED",
            ErrorCode::NoTeam => "NO_TEAM",
            ErrorCode::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            ErrorCode::BadMessage => "BAD_MESSAGE",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
            ErrorCode::BadMute => "BAD_MUTE",
            ErrorCode::NoDrawer => "NO_DRAWER",
            ErrorCode::InvalidTarget => "INVALID_TARGET",
        };
        f.write_str(s)
    }
}
