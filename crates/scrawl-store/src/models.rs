//! The persistent shape of a room.
//!
//! Everything the server knows about a room lives in one [`Room`] document:
//! header, players, roles, round configuration, live game state, canvas
//! ops, and the moderation log. The engine mutates rooms exclusively
//! through [`RoomStore`](crate::RoomStore), which keeps each mutation
//! atomic with respect to other connections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use scrawl_protocol::{Mode, Phase, Pid, RoomCode, RoomState, Team, Vote};

use crate::error::StoreError;

/// Canvas ops are capped per room; older strokes fall off the front.
pub const MAX_OPS: usize = 5000;

// ---------------------------------------------------------------------------
// Header and players
// ---------------------------------------------------------------------------

/// Identity and lifecycle of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomHeader {
    pub code: RoomCode,
    pub mode: Mode,
    pub state: RoomState,
    /// Maximum number of players, counting the GM.
    pub cap: u32,
    pub created_at: u64,
    /// Counts completed games in this room; seeds GM rotation in VS mode.
    pub game_no: u32,
    /// Set while a pre-game countdown is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_end_at: Option<u64>,
}

/// One player's record. Kicked players stay in the map so their pid can
/// never be reused to sneak back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub pid: Pid,
    pub name: String,
    pub connected: bool,
    pub kicked: bool,
    /// Epoch seconds until which the player may not send game commands.
    pub muted_until: u64,
    pub warnings: u32,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub joined_at: u64,
    pub last_seen: u64,
}

impl Player {
    pub fn new(pid: Pid, name: String, now: u64) -> Self {
        Player {
            pid,
            name,
            connected: true,
            kicked: false,
            muted_until: 0,
            warnings: 0,
            points: 0,
            team: None,
            joined_at: now,
            last_seen: now,
        }
    }

    /// Connected and not kicked. Only active players count for votes and
    /// role assignment.
    pub fn is_active(&self) -> bool {
        self.connected && !self.kicked
    }

    pub fn is_muted(&self, now: u64) -> bool {
        self.muted_until > now
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Who holds which named role. Guessers are implicit: every active
/// non-drawer, non-GM player guesses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gm: Option<Pid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawer: Option<Pid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawer_a: Option<Pid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawer_b: Option<Pid>,
}

impl RoleMap {
    pub fn is_gm(&self, pid: &Pid) -> bool {
        self.gm.as_ref() == Some(pid)
    }

    pub fn is_drawer(&self, pid: &Pid) -> bool {
        self.drawer.as_ref() == Some(pid)
            || self.drawer_a.as_ref() == Some(pid)
            || self.drawer_b.as_ref() == Some(pid)
    }

    /// The canvas a VS drawer draws on, if any.
    pub fn drawer_canvas(&self, pid: &Pid) -> Option<Team> {
        if self.drawer_a.as_ref() == Some(pid) {
            Some(Team::A)
        } else if self.drawer_b.as_ref() == Some(pid) {
            Some(Team::B)
        } else {
            None
        }
    }

    /// Drop the per-game drawer assignments, leaving the GM chair to the
    /// caller. Used when a finished game rolls into the next one.
    pub fn clear_round_roles(&mut self) {
        self.drawer = None;
        self.drawer_a = None;
        self.drawer_b = None;
    }

    /// Flatten into the wire shape, e.g. `{"gm": "p-1", "drawer_a": "p-2"}`.
    pub fn to_wire(&self) -> BTreeMap<String, Pid> {
        let mut map = BTreeMap::new();
        if let Some(p) = &self.gm {
            map.insert("gm".to_owned(), p.clone());
        }
        if let Some(p) = &self.drawer {
            map.insert("drawer".to_owned(), p.clone());
        }
        if let Some(p) = &self.drawer_a {
            map.insert("drawer_a".to_owned(), p.clone());
        }
        if let Some(p) = &self.drawer_b {
            map.insert("drawer_b".to_owned(), p.clone());
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Round configuration
// ---------------------------------------------------------------------------

/// GM-entered parameters for the upcoming game. The variant must match
/// the room's mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundConfig {
    Single {
        secret_word: String,
        stroke_limit: u32,
        time_limit_sec: u64,
    },
    Vs {
        secret_word: String,
        draw_window_sec: u64,
        guess_window_sec: u64,
        strokes_per_phase: u32,
        max_rounds: u32,
    },
}

impl RoundConfig {
    pub fn secret_word(&self) -> &str {
        match self {
            RoundConfig::Single { secret_word, .. } => secret_word,
            RoundConfig::Vs { secret_word, .. } => secret_word,
        }
    }
}

// ---------------------------------------------------------------------------
// Live game state
// ---------------------------------------------------------------------------

/// Mutable state of the game in progress (or just ended).
///
/// Deadlines are epoch seconds and drive the lazy clock: each one is
/// cleared by the transition it triggers, which makes expiry idempotent
/// no matter how many commands observe it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub phase: Phase,
    pub round_no: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_end_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guess_end_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_end_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_end_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_ops_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_pid: Option<Pid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,
    /// Continue-vote ballots, rebuilt against the eligible set on every
    /// cast so departed players cannot wedge the tally.
    #[serde(default)]
    pub votes: BTreeMap<Pid, Vote>,
    /// VS: teams that have used their one guess this round.
    #[serde(default)]
    pub guessed: BTreeMap<Team, bool>,
    /// VS: games won per team across the room's lifetime.
    #[serde(default)]
    pub score: BTreeMap<Team, u32>,
}

impl GameState {
    /// Reset everything that belongs to a single game, keeping the
    /// cross-game score.
    pub fn reset_for_new_game(&mut self) {
        let score = std::mem::take(&mut self.score);
        *self = GameState { score, ..GameState::default() };
    }
}

// ---------------------------------------------------------------------------
// Canvas ops and moderation
// ---------------------------------------------------------------------------

/// What kind of mark an op leaves on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Line,
    Circle,
    Sabotage,
}

/// One accepted canvas operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawOp {
    pub t: OpKind,
    /// Geometry payload, passed through untouched after validation.
    pub p: Value,
    pub ts: u64,
    pub by: Pid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Team>,
}

/// One line in the room's moderation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModLogEntry {
    pub ts: u64,
    pub actor: Pid,
    pub action: String,
    pub target: Pid,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u64>,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// The complete room document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub header: RoomHeader,
    pub players: BTreeMap<Pid, Player>,
    pub roles: RoleMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_config: Option<RoundConfig>,
    pub game: GameState,
    /// Remaining stroke budgets by canvas: `"pool"` in SINGLE mode, team
    /// letters in VS mode.
    #[serde(default)]
    pub budgets: BTreeMap<String, u32>,
    /// Per-team sabotage cooldown expiry, epoch seconds.
    #[serde(default)]
    pub sabotage_until: BTreeMap<Team, u64>,
    pub ops: Vec<DrawOp>,
    pub modlog: Vec<ModLogEntry>,
    /// Room TTL; refreshed by every handled command.
    pub expires_at: u64,
}

impl Room {
    pub fn new(code: RoomCode, mode: Mode, cap: u32, now: u64, ttl_sec: u64) -> Self {
        Room {
            header: RoomHeader {
                code,
                mode,
                state: RoomState::Waiting,
                cap,
                created_at: now,
                game_no: 0,
                countdown_end_at: None,
            },
            players: BTreeMap::new(),
            roles: RoleMap::default(),
            round_config: None,
            game: GameState::default(),
            budgets: BTreeMap::new(),
            sabotage_until: BTreeMap::new(),
            ops: Vec::new(),
            modlog: Vec::new(),
            expires_at: now + ttl_sec,
        }
    }

    pub fn player(&self, pid: &Pid) -> Result<&Player, StoreError> {
        self.players
            .get(pid)
            .ok_or_else(|| StoreError::PlayerNotFound(pid.clone()))
    }

    pub fn player_mut(&mut self, pid: &Pid) -> Result<&mut Player, StoreError> {
        self.players
            .get_mut(pid)
            .ok_or_else(|| StoreError::PlayerNotFound(pid.clone()))
    }

    /// Active (connected, non-kicked) players, GM included.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_active())
    }

    /// Team rosters derived from player records. The GM never appears.
    pub fn teams(&self) -> BTreeMap<Team, Vec<Pid>> {
        let mut teams: BTreeMap<Team, Vec<Pid>> = BTreeMap::new();
        teams.insert(Team::A, Vec::new());
        teams.insert(Team::B, Vec::new());
        for p in self.players.values() {
            if self.roles.is_gm(&p.pid) {
                continue;
            }
            if let Some(team) = p.team {
                if let Some(roster) = teams.get_mut(&team) {
                    roster.push(p.pid.clone());
                }
            }
        }
        teams
    }

    /// Put a player on a team. The GM referees and may not join one.
    pub fn assign_team(&mut self, pid: &Pid, team: Team) -> Result<(), StoreError> {
        if self.roles.is_gm(pid) {
            return Err(StoreError::GmHasNoTeam(pid.clone()));
        }
        self.player_mut(pid)?.team = Some(team);
        Ok(())
    }

    /// Append an accepted op, trimming the history to [`MAX_OPS`].
    pub fn push_op(&mut self, op: DrawOp) {
        self.ops.push(op);
        if self.ops.len() > MAX_OPS {
            let excess = self.ops.len() - MAX_OPS;
            self.ops.drain(..excess);
        }
    }
}
