//! Game-flow transitions shared by command handlers and the lazy clock.
//!
//! Everything here is a pure mutation of one [`Room`] plus the events it
//! produced, so the same transition fires identically whether a command
//! or an overdue deadline triggered it.

use std::collections::BTreeMap;

use scrawl_protocol::{Phase, RoomState, ServerEvent, Team};
use scrawl_store::{Room, RoundConfig};

use crate::error::Reject;
use crate::fsm;
use crate::rules::{CLEAR_OPS_DELAY_SEC, VOTE_WINDOW_SEC};

/// End reasons carried by `game_end`.
pub mod reason {
    pub const CORRECT_GUESS: &str = "CORRECT_GUESS";
    pub const TIME_UP: &str = "TIME_UP";
    pub const MAX_ROUNDS: &str = "MAX_ROUNDS";
    pub const GM_END: &str = "GM_END";
}

/// Fill the budget table for a fresh DRAW phase.
pub fn refill_budgets(room: &mut Room) {
    let mut budgets = BTreeMap::new();
    match &room.round_config {
        Some(RoundConfig::Single { stroke_limit, .. }) => {
            budgets.insert("pool".to_owned(), *stroke_limit);
        }
        Some(RoundConfig::Vs { strokes_per_phase, .. }) => {
            budgets.insert(Team::A.to_string(), *strokes_per_phase);
            budgets.insert(Team::B.to_string(), *strokes_per_phase);
        }
        None => {}
    }
    room.budgets = budgets;
}

pub fn budget_event(room: &Room) -> ServerEvent {
    ServerEvent::BudgetUpdate { budget: room.budgets.clone() }
}

fn phase_event(room: &Room) -> ServerEvent {
    ServerEvent::PhaseChanged {
        phase: room.game.phase,
        round_no: room.game.round_no,
    }
}

/// CONFIG → IN_GAME. Arms the first DRAW phase for the room's mode.
pub fn start_game(room: &mut Room, now: u64) -> Result<Vec<ServerEvent>, Reject> {
    fsm::transition(room, RoomState::InGame)?;
    room.header.countdown_end_at = None;
    room.game.reset_for_new_game();
    room.game.phase = Phase::Draw;
    room.game.round_no = 1;
    refill_budgets(room);

    match &room.round_config {
        Some(RoundConfig::Single { time_limit_sec, .. }) => {
            room.game.round_end_at = Some(now + time_limit_sec);
        }
        Some(RoundConfig::Vs { draw_window_sec, .. }) => {
            room.game.draw_end_at = Some(now + draw_window_sec);
        }
        // start_game is gated on a config being present.
        None => {}
    }

    Ok(vec![
        ServerEvent::RoomStateChanged { state: RoomState::InGame },
        phase_event(room),
        budget_event(room),
    ])
}

/// VS: DRAW → GUESS. Consumes `draw_end_at`.
pub fn enter_guess(room: &mut Room, now: u64) -> Vec<ServerEvent> {
    let guess_window = match &room.round_config {
        Some(RoundConfig::Vs { guess_window_sec, .. }) => *guess_window_sec,
        _ => return Vec::new(),
    };
    room.game.phase = Phase::Guess;
    room.game.draw_end_at = None;
    room.game.guess_end_at = Some(now + guess_window);
    room.game.guessed.clear();
    vec![phase_event(room)]
}

/// VS: both teams missed (or the guess window lapsed). Either starts the
/// next round or ends the game with no winner at `max_rounds`.
pub fn next_round_or_end(room: &mut Room, now: u64) -> Vec<ServerEvent> {
    let (draw_window, max_rounds) = match &room.round_config {
        Some(RoundConfig::Vs { draw_window_sec, max_rounds, .. }) => {
            (*draw_window_sec, *max_rounds)
        }
        _ => return Vec::new(),
    };

    if room.game.round_no >= max_rounds {
        return end_game(room, now, None, None, reason::MAX_ROUNDS);
    }

    let finished = room.game.round_no;
    room.game.round_no += 1;
    room.game.phase = Phase::Draw;
    room.game.guess_end_at = None;
    room.game.draw_end_at = Some(now + draw_window);
    room.game.guessed.clear();
    refill_budgets(room);

    vec![
        ServerEvent::RoundEnd { winner: None, round_no: finished },
        phase_event(room),
        budget_event(room),
    ]
}

/// IN_GAME → GAME_END with the continue vote opened.
///
/// Point awards happen at the call sites; this only settles state,
/// deadlines, and the reveal.
pub fn end_game(
    room: &mut Room,
    now: u64,
    winner_team: Option<Team>,
    winner_pid: Option<scrawl_protocol::Pid>,
    end_reason: &str,
) -> Vec<ServerEvent> {
    if fsm::transition(room, RoomState::GameEnd).is_err() {
        // Already ended: a concurrent trigger fired first.
        return Vec::new();
    }

    let word = room
        .round_config
        .as_ref()
        .map(|cfg| cfg.secret_word().to_owned())
        .unwrap_or_default();

    room.game.phase = Phase::Voting;
    room.game.draw_end_at = None;
    room.game.guess_end_at = None;
    room.game.round_end_at = None;
    room.game.winner_team = winner_team;
    room.game.winner_pid = winner_pid.clone();
    room.game.end_reason = Some(end_reason.to_owned());
    room.game.votes.clear();
    room.game.clear_ops_at = Some(now + CLEAR_OPS_DELAY_SEC);
    // SINGLE has no vote window: the vote resolves only once everyone
    // has cast.
    room.game.vote_end_at = match room.header.mode {
        scrawl_protocol::Mode::Vs => Some(now + VOTE_WINDOW_SEC),
        scrawl_protocol::Mode::Single => None,
    };

    vec![
        ServerEvent::RoomStateChanged { state: RoomState::GameEnd },
        phase_event(room),
        ServerEvent::GameEnd {
            winner: winner_team,
            winner_pid,
            word,
            game_no: room.header.game_no,
            round_no: room.game.round_no,
            reason: end_reason.to_owned(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_protocol::{Mode, Pid, RoomCode};
    use scrawl_store::Player;

    fn vs_room() -> Room {
        let mut room = Room::new(RoomCode::from("FLOW01"), Mode::Vs, 8, 100, 1800);
        for (name, team) in [
            ("gm", None),
            ("a1", Some(Team::A)),
            ("a2", Some(Team::A)),
            ("b1", Some(Team::B)),
            ("b2", Some(Team::B)),
        ] {
            let pid = Pid::from(name);
            let mut p = Player::new(pid.clone(), name.into(), 100);
            p.team = team;
            room.players.insert(pid, p);
        }
        room.roles.gm = Some(Pid::from("gm"));
        room.round_config = Some(RoundConfig::Vs {
            secret_word: "ELEPHANT".into(),
            draw_window_sec: 60,
            guess_window_sec: 30,
            strokes_per_phase: 3,
            max_rounds: 2,
        });
        room.header.state = RoomState::Config;
        room
    }

    #[test]
    fn test_start_game_arms_draw_with_budgets() {
        let mut room = vs_room();
        let events = start_game(&mut room, 1000).unwrap();
        assert_eq!(room.header.state, RoomState::InGame);
        assert_eq!(room.game.phase, Phase::Draw);
        assert_eq!(room.game.round_no, 1);
        assert_eq!(room.game.draw_end_at, Some(1060));
        assert_eq!(room.budgets["A"], 3);
        assert_eq!(room.budgets["B"], 3);
        assert!(matches!(events[0], ServerEvent::RoomStateChanged { state: RoomState::InGame }));
    }

    #[test]
    fn test_enter_guess_consumes_draw_deadline() {
        let mut room = vs_room();
        start_game(&mut room, 1000).unwrap();
        let events = enter_guess(&mut room, 1060);
        assert_eq!(room.game.phase, Phase::Guess);
        assert_eq!(room.game.draw_end_at, None);
        assert_eq!(room.game.guess_end_at, Some(1090));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_next_round_refills_budgets() {
        let mut room = vs_room();
        start_game(&mut room, 1000).unwrap();
        enter_guess(&mut room, 1060);
        room.budgets.insert("A".into(), 0);
        let events = next_round_or_end(&mut room, 1090);
        assert_eq!(room.game.round_no, 2);
        assert_eq!(room.game.phase, Phase::Draw);
        assert_eq!(room.budgets["A"], 3);
        assert!(matches!(events[0], ServerEvent::RoundEnd { winner: None, round_no: 1 }));
    }

    #[test]
    fn test_max_rounds_ends_with_no_winner() {
        let mut room = vs_room();
        start_game(&mut room, 1000).unwrap();
        room.game.round_no = 2;
        let events = next_round_or_end(&mut room, 2000);
        assert_eq!(room.header.state, RoomState::GameEnd);
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::GameEnd { winner: None, reason, .. } if reason == reason::MAX_ROUNDS
        )));
    }

    #[test]
    fn test_end_game_reveals_word_and_opens_vote() {
        let mut room = vs_room();
        start_game(&mut room, 1000).unwrap();
        let events = end_game(&mut room, 1100, Some(Team::A), None, reason::CORRECT_GUESS);
        assert_eq!(room.header.state, RoomState::GameEnd);
        assert_eq!(room.game.phase, Phase::Voting);
        assert_eq!(room.game.vote_end_at, Some(1100 + VOTE_WINDOW_SEC));
        assert_eq!(room.game.clear_ops_at, Some(1100 + CLEAR_OPS_DELAY_SEC));
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::GameEnd { word, .. } if word == "ELEPHANT"
        )));
    }

    #[test]
    fn test_end_game_twice_is_a_no_op() {
        let mut room = vs_room();
        start_game(&mut room, 1000).unwrap();
        let first = end_game(&mut room, 1100, None, None, reason::TIME_UP);
        let second = end_game(&mut room, 1100, None, None, reason::TIME_UP);
        assert!(!first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn test_single_games_have_no_vote_window() {
        let mut room = vs_room();
        room.header.mode = Mode::Single;
        room.round_config = Some(RoundConfig::Single {
            secret_word: "apple".into(),
            stroke_limit: 20,
            time_limit_sec: 120,
        });
        start_game(&mut room, 1000).unwrap();
        end_game(&mut room, 1050, None, None, reason::TIME_UP);
        assert_eq!(room.game.vote_end_at, None);
    }
}
