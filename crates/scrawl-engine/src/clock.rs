//! The lazy clock.
//!
//! There is no background scheduler: every command entry point calls
//! [`advance_clock`] before doing its own work, so overdue deadlines are
//! settled on whatever traffic reaches the room next. Each transition
//! clears the deadline it consumed, which makes re-evaluation a no-op no
//! matter how many connections observe the same expiry.

use scrawl_protocol::{Mode, Phase, RoomEvent, RoomState, ServerEvent};
use scrawl_store::{GameState, Room};
use tracing::warn;

use crate::flow::{self, reason};
use crate::voting;

/// Fires every overdue transition for this room, oldest consequence
/// first, and returns the events to broadcast. Bounded because each
/// iteration consumes at least one deadline.
pub fn advance_clock(room: &mut Room, now: u64) -> Vec<RoomEvent> {
    let mut events = Vec::new();
    // Several independent deadlines can be overdue at once (e.g. a
    // scheduled ops-clear and the lobby reset behind it), so loop to a
    // fixed point.
    loop {
        let fired = step(room, now, &mut events);
        if !fired {
            break;
        }
    }
    events.into_iter().map(RoomEvent::all).collect()
}

fn step(room: &mut Room, now: u64, out: &mut Vec<ServerEvent>) -> bool {
    // Countdown auto-start.
    if room.header.state == RoomState::Config {
        if let Some(end) = room.header.countdown_end_at {
            if end <= now {
                room.header.countdown_end_at = None;
                match flow::start_game(room, now) {
                    Ok(events) => out.extend(events),
                    Err(err) => {
                        warn!(room = %room.header.code, %err, "countdown start failed");
                    }
                }
                return true;
            }
        }
    }

    if room.header.state == RoomState::InGame {
        // SINGLE full-game timeout.
        if let Some(end) = room.game.round_end_at {
            if end <= now {
                room.game.round_end_at = None;
                out.extend(flow::end_game(room, now, None, None, reason::TIME_UP));
                return true;
            }
        }
        // VS draw window.
        if let Some(end) = room.game.draw_end_at {
            if end <= now {
                out.extend(flow::enter_guess(room, now));
                return true;
            }
        }
        // VS guess window: unanswered guesses count as wrong.
        if let Some(end) = room.game.guess_end_at {
            if end <= now {
                room.game.guess_end_at = None;
                out.extend(flow::next_round_or_end(room, now));
                return true;
            }
        }
    }

    if room.header.state == RoomState::GameEnd && room.game.phase == Phase::Voting {
        if let Some(end) = room.game.vote_end_at {
            if end <= now {
                out.extend(voting::resolve(room, now));
                return true;
            }
        }
    }

    // Scheduled canvas wipe.
    if let Some(end) = room.game.clear_ops_at {
        if end <= now {
            room.game.clear_ops_at = None;
            room.ops.clear();
            return true;
        }
    }

    // Scheduled lobby reset after the VS leaderboard.
    if let Some(end) = room.game.reset_at {
        if end <= now {
            reset_to_lobby(room);
            out.push(ServerEvent::RoomStateChanged { state: RoomState::Waiting });
            return true;
        }
    }

    false
}

fn reset_to_lobby(room: &mut Room) {
    room.header.state = RoomState::Waiting;
    room.header.countdown_end_at = None;
    room.roles = Default::default();
    room.round_config = None;
    room.game = GameState::default();
    room.budgets.clear();
    room.sabotage_until.clear();
    room.ops.clear();
    if room.header.mode == Mode::Vs {
        for p in room.players.values_mut() {
            p.team = None;
        }
    }
}
