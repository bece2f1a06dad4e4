//! Game handlers: configuration, start, phase control, guessing, the
//! continue vote, and GM-initiated endings.

use scrawl_protocol::{ErrorCode, Mode, Phase, Pid, RoomState, ServerEvent, Team, Vote};
use scrawl_store::{Room, RoundConfig};

use crate::error::Reject;
use crate::flow::{self, reason};
use crate::fsm;
use crate::output::Reply;
use crate::rules::{self, STROKES_PER_PHASE_MAX, STROKES_PER_PHASE_MIN};
use crate::snapshot;
use crate::voting::{self, VoteStatus};

fn require_gm(room: &Room, pid: &Pid) -> Result<(), Reject> {
    if !room.roles.is_gm(pid) {
        return Err(Reject::new(ErrorCode::NotGm, "only the GameMaster can do that"));
    }
    Ok(())
}

fn require_in_game(room: &Room) -> Result<(), Reject> {
    if room.header.state != RoomState::InGame {
        return Err(Reject::new(
            ErrorCode::BadState,
            format!("no game is running in {}", room.header.state),
        ));
    }
    Ok(())
}

/// A config command is valid in ROLE_PICK (first time) or CONFIG
/// (replacing the previous settings); either way the room lands on
/// CONFIG.
fn enter_config(room: &mut Room) -> Result<Vec<ServerEvent>, Reject> {
    match room.header.state {
        RoomState::Config => Ok(Vec::new()),
        _ => {
            fsm::transition(room, RoomState::Config)?;
            Ok(vec![ServerEvent::RoomStateChanged { state: RoomState::Config }])
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub fn set_round_config(
    room: &mut Room,
    pid: &Pid,
    secret_word: String,
    stroke_limit: u32,
    time_limit_sec: u64,
) -> Result<Reply, Reject> {
    require_gm(room, pid)?;
    if room.header.mode != Mode::Single {
        return Err(Reject::new(
            ErrorCode::NotSingle,
            "set_round_config is for SINGLE rooms",
        ));
    }
    if secret_word.trim().is_empty() || stroke_limit == 0 {
        return Err(Reject::new(
            ErrorCode::ConfigMissing,
            "secret word, stroke limit, and time limit are all required",
        ));
    }
    if !rules::timer_in_range(time_limit_sec) {
        return Err(Reject::new(
            ErrorCode::ConfigMissing,
            format!("time limit must be 1..={} seconds", rules::MAX_TIMER_SEC),
        ));
    }

    let events = enter_config(room)?;
    room.round_config = Some(RoundConfig::Single {
        secret_word,
        stroke_limit,
        time_limit_sec,
    });

    let mut reply = Reply::new();
    for ev in events {
        reply.push_room(ev);
    }
    push_config_snapshots(room, &mut reply);
    Ok(reply)
}

pub fn set_vs_config(
    room: &mut Room,
    pid: &Pid,
    secret_word: String,
    draw_window_sec: u64,
    guess_window_sec: u64,
    strokes_per_phase: u32,
    max_rounds: u32,
) -> Result<Reply, Reject> {
    require_gm(room, pid)?;
    if room.header.mode != Mode::Vs {
        return Err(Reject::new(ErrorCode::NotVs, "set_vs_config is for VS rooms"));
    }
    if secret_word.trim().is_empty() || max_rounds == 0 {
        return Err(Reject::new(
            ErrorCode::ConfigMissing,
            "secret word, windows, and max rounds are all required",
        ));
    }
    if !rules::timer_in_range(draw_window_sec) || !rules::timer_in_range(guess_window_sec) {
        return Err(Reject::new(
            ErrorCode::ConfigMissing,
            format!("windows must be 1..={} seconds", rules::MAX_TIMER_SEC),
        ));
    }

    let events = enter_config(room)?;
    room.round_config = Some(RoundConfig::Vs {
        secret_word,
        draw_window_sec,
        guess_window_sec,
        strokes_per_phase: strokes_per_phase.clamp(STROKES_PER_PHASE_MIN, STROKES_PER_PHASE_MAX),
        max_rounds,
    });

    let mut reply = Reply::new();
    for ev in events {
        reply.push_room(ev);
    }
    push_config_snapshots(room, &mut reply);
    Ok(reply)
}

/// The GM and drawers are the only viewers whose snapshots include the
/// secret word; push each of them a fresh private copy so their view
/// picks up the new settings without an explicit snapshot request.
fn push_config_snapshots(room: &Room, reply: &mut Reply) {
    let roles = &room.roles;
    for pid in [&roles.gm, &roles.drawer, &roles.drawer_a, &roles.drawer_b]
        .into_iter()
        .flatten()
    {
        reply.push_targeted(vec![pid.clone()], snapshot::snapshot_for(room, pid));
    }
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

pub fn start_game(
    room: &mut Room,
    pid: &Pid,
    countdown_sec: Option<u64>,
    now: u64,
) -> Result<Reply, Reject> {
    require_gm(room, pid)?;
    if room.header.state != RoomState::Config {
        return Err(Reject::new(
            ErrorCode::BadState,
            format!("cannot start a game from {}", room.header.state),
        ));
    }
    if room.round_config.is_none() {
        return Err(Reject::new(ErrorCode::ConfigMissing, "configure the round first"));
    }
    if room.header.mode == Mode::Vs {
        if room.roles.drawer_a.is_none() || room.roles.drawer_b.is_none() {
            return Err(Reject::new(ErrorCode::NoDrawer, "each team needs a drawer"));
        }
    } else if room.roles.drawer.is_none() {
        return Err(Reject::new(ErrorCode::NoDrawer, "no drawer assigned"));
    }

    match countdown_sec {
        Some(sec) if sec > 0 => {
            if !rules::timer_in_range(sec) {
                return Err(Reject::new(
                    ErrorCode::BadState,
                    format!("countdown must be 1..={} seconds", rules::MAX_TIMER_SEC),
                ));
            }
            // The lazy clock performs the real start once the countdown
            // elapses.
            let end_at = now + sec;
            room.header.countdown_end_at = Some(end_at);
            Ok(Reply::broadcast(ServerEvent::CountdownStarted { end_at }))
        }
        _ => {
            let events = flow::start_game(room, now)?;
            let mut reply = Reply::new();
            for ev in events {
                reply.push_room(ev);
            }
            Ok(reply)
        }
    }
}

// ---------------------------------------------------------------------------
// Phase control
// ---------------------------------------------------------------------------

/// SINGLE: the GM toggles DRAW ↔ GUESS; re-entering DRAW refills the
/// stroke pool. VS: the GM cuts the DRAW window short and opens GUESS
/// early.
pub fn phase_tick(room: &mut Room, pid: &Pid, now: u64) -> Result<Reply, Reject> {
    require_gm(room, pid)?;
    require_in_game(room)?;

    let mut reply = Reply::new();
    if room.header.mode == Mode::Vs {
        if room.game.phase != Phase::Draw {
            return Err(Reject::new(
                ErrorCode::BadPhase,
                format!("cannot tick from phase {:?}", room.game.phase),
            ));
        }
        for ev in flow::enter_guess(room, now) {
            reply.push_room(ev);
        }
        return Ok(reply);
    }

    match room.game.phase {
        Phase::Draw => {
            room.game.phase = Phase::Guess;
        }
        Phase::Guess => {
            room.game.phase = Phase::Draw;
            flow::refill_budgets(room);
            reply.push_room(flow::budget_event(room));
        }
        other => {
            return Err(Reject::new(
                ErrorCode::BadPhase,
                format!("cannot tick from phase {other:?}"),
            ));
        }
    }
    reply.push_room(ServerEvent::PhaseChanged {
        phase: room.game.phase,
        round_no: room.game.round_no,
    });
    Ok(reply)
}

/// VS: the GM cuts the current round short; unanswered guesses count
/// as wrong.
pub fn end_round(room: &mut Room, pid: &Pid, now: u64) -> Result<Reply, Reject> {
    require_gm(room, pid)?;
    require_in_game(room)?;
    if room.header.mode != Mode::Vs {
        return Err(Reject::new(ErrorCode::NotVs, "end_round is for VS rooms"));
    }
    room.game.draw_end_at = None;
    room.game.guess_end_at = None;
    let events = flow::next_round_or_end(room, now);
    let mut reply = Reply::new();
    for ev in events {
        reply.push_room(ev);
    }
    Ok(reply)
}

/// The GM ends the game immediately with no winner.
pub fn end_game(room: &mut Room, pid: &Pid, now: u64) -> Result<Reply, Reject> {
    require_gm(room, pid)?;
    require_in_game(room)?;
    let events = flow::end_game(room, now, None, None, reason::GM_END);
    let mut reply = Reply::new();
    for ev in events {
        reply.push_room(ev);
    }
    Ok(reply)
}

// ---------------------------------------------------------------------------
// Guessing
// ---------------------------------------------------------------------------

pub fn guess(room: &mut Room, pid: &Pid, text: String, now: u64) -> Result<Reply, Reject> {
    require_in_game(room)?;
    if room.game.phase != Phase::Guess {
        return Err(Reject::new(ErrorCode::BadPhase, "guessing is only open in GUESS"));
    }
    if rules::normalize_guess(&text).is_empty() {
        return Err(Reject::new(ErrorCode::EmptyGuess, "guess something"));
    }
    if room.roles.is_gm(pid) || room.roles.is_drawer(pid) {
        return Err(Reject::new(ErrorCode::NotGuesser, "only guessers may guess"));
    }

    match room.header.mode {
        Mode::Single => guess_single(room, pid, text, now),
        Mode::Vs => guess_vs(room, pid, text, now),
    }
}

fn guess_single(room: &mut Room, pid: &Pid, text: String, now: u64) -> Result<Reply, Reject> {
    let secret = room
        .round_config
        .as_ref()
        .map(|cfg| cfg.secret_word().to_owned())
        .unwrap_or_default();
    let correct = rules::guess_matches(&text, &secret);
    let name = room.player(pid)?.name.clone();

    let mut reply = Reply::new();
    // Wrong guesses double as chat; everyone sees each attempt.
    reply.push_room(ServerEvent::GuessChat {
        ts: now,
        pid: pid.clone(),
        name,
        text: text.clone(),
    });
    reply.push_room(ServerEvent::GuessResult {
        correct,
        team: None,
        text,
        by: pid.clone(),
    });

    if correct {
        // Guesser and drawer each score a point.
        let drawer = room.roles.drawer.clone();
        if let Ok(p) = room.player_mut(pid) {
            p.points += 1;
        }
        if let Some(drawer) = drawer {
            if let Some(p) = room.players.get_mut(&drawer) {
                p.points += 1;
            }
        }
        for ev in flow::end_game(room, now, None, Some(pid.clone()), reason::CORRECT_GUESS) {
            reply.push_room(ev);
        }
    }
    Ok(reply)
}

fn guess_vs(room: &mut Room, pid: &Pid, text: String, now: u64) -> Result<Reply, Reject> {
    let team = room
        .player(pid)?
        .team
        .ok_or_else(|| Reject::new(ErrorCode::NoTeam, "pick a team first"))?;
    if room.game.guessed.get(&team).copied().unwrap_or(false) {
        return Err(Reject::new(
            ErrorCode::AlreadyGuessed,
            format!("team {team} already used its guess this round"),
        ));
    }

    let secret = room
        .round_config
        .as_ref()
        .map(|cfg| cfg.secret_word().to_owned())
        .unwrap_or_default();
    let correct = rules::guess_matches(&text, &secret);

    let mut reply = Reply::new();
    reply.push_room(ServerEvent::GuessResult {
        correct,
        team: Some(team),
        text,
        by: pid.clone(),
    });

    if correct {
        award_team_win(room, team);
        for ev in flow::end_game(room, now, Some(team), Some(pid.clone()), reason::CORRECT_GUESS)
        {
            reply.push_room(ev);
        }
        return Ok(reply);
    }

    room.game.guessed.insert(team, true);
    let both_missed = [Team::A, Team::B]
        .iter()
        .all(|t| room.game.guessed.get(t).copied().unwrap_or(false));
    if both_missed {
        room.game.guess_end_at = None;
        for ev in flow::next_round_or_end(room, now) {
            reply.push_room(ev);
        }
    }
    Ok(reply)
}

fn award_team_win(room: &mut Room, team: Team) {
    *room.game.score.entry(team).or_insert(0) += 1;
    let members: Vec<Pid> = room.teams().get(&team).cloned().unwrap_or_default();
    for pid in members {
        if let Some(p) = room.players.get_mut(&pid) {
            p.points += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Continue vote
// ---------------------------------------------------------------------------

pub fn vote_next(room: &mut Room, pid: &Pid, vote: Vote, now: u64) -> Result<Reply, Reject> {
    let mut reply = Reply::new();
    match voting::cast_vote(room, pid, vote, now)? {
        VoteStatus::Pending { yes, no, eligible } => {
            reply.push_room(ServerEvent::VoteProgress { yes, no, eligible });
        }
        VoteStatus::Resolved(events) => {
            for ev in events {
                reply.push_room(ev);
            }
        }
    }
    Ok(reply)
}
