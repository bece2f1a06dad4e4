//! Game constants and pure rule checks.

use serde_json::Value;

use scrawl_protocol::ErrorCode;
use scrawl_store::OpKind;

use crate::error::Reject;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// VS needs two teams of two plus a GM.
pub const MIN_PLAYERS_VS: u32 = 5;
pub const STROKES_PER_PHASE_MIN: u32 = 3;
pub const STROKES_PER_PHASE_MAX: u32 = 5;

pub const SABOTAGE_COOLDOWN_SEC: u64 = 180;
/// Sabotage is disabled in the final stretch of a draw window.
pub const SABOTAGE_BLACKOUT_SEC: u64 = 30;

/// A single stroke may not claim more drawing time than this.
pub const MAX_STROKE_DURATION_SEC: u64 = 10;
pub const MAX_STROKE_POINTS: usize = 1000;
pub const MAX_CIRCLE_RADIUS: f64 = 1000.0;

/// How long the continue vote stays open after a VS game ends.
pub const VOTE_WINDOW_SEC: u64 = 30;
/// Canvas wipe is scheduled shortly after a game resolves.
pub const CLEAR_OPS_DELAY_SEC: u64 = 5;
/// How long the identity-stripped leaderboard is shown before the room
/// drops back to the lobby.
pub const LEADERBOARD_RESET_SEC: u64 = 30;

/// Upper bound for any client-supplied duration (countdowns, round
/// timers, mute sentences). Keeps deadline arithmetic far away from
/// u64 overflow.
pub const MAX_TIMER_SEC: u64 = 86_400;

/// Client durations must be positive and at most a day.
pub fn timer_in_range(sec: u64) -> bool {
    (1..=MAX_TIMER_SEC).contains(&sec)
}

// ---------------------------------------------------------------------------
// Guess comparison
// ---------------------------------------------------------------------------

/// Lowercase and strip all whitespace, inside and out, so "  New  York "
/// matches "newyork".
pub fn normalize_guess(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn guess_matches(guess: &str, secret_word: &str) -> bool {
    let guess = normalize_guess(guess);
    !guess.is_empty() && guess == normalize_guess(secret_word)
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

/// Strict majority: floor(n/2) + 1 yes votes.
pub fn majority_reached(yes_count: usize, eligible_count: usize) -> bool {
    eligible_count > 0 && yes_count >= eligible_count / 2 + 1
}

// ---------------------------------------------------------------------------
// Sabotage gating
// ---------------------------------------------------------------------------

/// The blackout check only; cooldown and budget are charged atomically
/// by the store.
pub fn sabotage_in_blackout(now: u64, draw_end_at: Option<u64>) -> bool {
    match draw_end_at {
        Some(end) => now + SABOTAGE_BLACKOUT_SEC >= end,
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Draw-op validation
// ---------------------------------------------------------------------------

/// Checks an inbound op payload and returns its kind.
///
/// A line needs a `pts` array of at least two points; a circle needs
/// numeric `cx`/`cy` and a radius within `[0, MAX_CIRCLE_RADIUS]`.
pub fn validate_op(op: &Value) -> Result<OpKind, Reject> {
    let kind = op
        .get("t")
        .and_then(Value::as_str)
        .ok_or_else(|| Reject::new(ErrorCode::InvalidOp, "op is missing a tool type"))?;
    let payload = op
        .get("p")
        .ok_or_else(|| Reject::new(ErrorCode::InvalidOp, "op is missing a payload"))?;

    match kind {
        "line" => {
            let pts = payload
                .get("pts")
                .and_then(Value::as_array)
                .ok_or_else(|| Reject::new(ErrorCode::InvalidLine, "line needs a pts array"))?;
            if pts.len() < 2 {
                return Err(Reject::new(
                    ErrorCode::InvalidLine,
                    "line needs at least two points",
                ));
            }
            Ok(OpKind::Line)
        }
        "circle" => {
            for key in ["cx", "cy"] {
                if payload.get(key).and_then(Value::as_f64).is_none() {
                    return Err(Reject::new(
                        ErrorCode::InvalidCircle,
                        format!("circle needs a numeric {key}"),
                    ));
                }
            }
            let r = payload
                .get("r")
                .and_then(Value::as_f64)
                .ok_or_else(|| Reject::new(ErrorCode::InvalidCircle, "circle needs a radius"))?;
            if !(0.0..=MAX_CIRCLE_RADIUS).contains(&r) {
                return Err(Reject::new(
                    ErrorCode::InvalidRadius,
                    format!("radius must be between 0 and {MAX_CIRCLE_RADIUS}"),
                ));
            }
            Ok(OpKind::Circle)
        }
        other => Err(Reject::new(
            ErrorCode::InvalidOp,
            format!("unknown tool type {other:?}"),
        )),
    }
}

/// A stroke that claims too much drawing time or too many points is the
/// auto-split abuse pattern: one "stroke" standing in for unlimited
/// drawing. The caller still charges the budget for it.
pub fn stroke_too_long(op: &Value) -> bool {
    let payload = match op.get("p") {
        Some(p) => p,
        None => return false,
    };
    if payload
        .get("dur_sec")
        .and_then(Value::as_u64)
        .is_some_and(|d| d > MAX_STROKE_DURATION_SEC)
    {
        return true;
    }
    payload
        .get("pts")
        .and_then(Value::as_array)
        .is_some_and(|pts| pts.len() > MAX_STROKE_POINTS)
}
