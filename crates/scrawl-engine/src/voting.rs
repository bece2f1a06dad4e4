//! The post-game continue vote.
//!
//! Eligibility is recomputed on every cast and at resolution: only
//! currently active (connected, non-kicked) players count, GM included.
//! Ballots from players who have since gone inactive are dropped, so a
//! departed voter can never wedge the tally.

use scrawl_protocol::{ErrorCode, Phase, Pid, RoomState, ServerEvent, Team, Vote, VoteOutcome};
use scrawl_store::Room;

use crate::error::Reject;
use crate::roles;
use crate::rules::{self, CLEAR_OPS_DELAY_SEC, LEADERBOARD_RESET_SEC};

/// Where a cast left the vote.
#[derive(Debug, PartialEq)]
pub enum VoteStatus {
    /// Still waiting on ballots.
    Pending { yes: u32, no: u32, eligible: u32 },
    /// Every eligible voter has cast; the vote resolved.
    Resolved(Vec<ServerEvent>),
}

pub fn eligible_voters(room: &Room) -> Vec<Pid> {
    room.active_players().map(|p| p.pid.clone()).collect()
}

/// Records one ballot, rebuilding the ballot set against the current
/// eligible voters. Resolves immediately once everyone has voted.
pub fn cast_vote(room: &mut Room, pid: &Pid, vote: Vote, now: u64) -> Result<VoteStatus, Reject> {
    if room.header.state != RoomState::GameEnd || room.game.phase != Phase::Voting {
        return Err(Reject::new(
            ErrorCode::BadPhase,
            "there is no vote open right now",
        ));
    }

    let eligible = eligible_voters(room);
    if eligible.is_empty() {
        return Err(Reject::new(ErrorCode::NoEligibleVoters, "no eligible voters"));
    }
    if !eligible.contains(pid) {
        return Err(Reject::new(ErrorCode::NotActive, "only active players can vote"));
    }

    room.game.votes.retain(|voter, _| eligible.contains(voter));
    room.game.votes.insert(pid.clone(), vote);

    if eligible.iter().all(|p| room.game.votes.contains_key(p)) {
        return Ok(VoteStatus::Resolved(resolve(room, now)));
    }

    let yes = room.game.votes.values().filter(|v| **v == Vote::Yes).count() as u32;
    let no = room.game.votes.len() as u32 - yes;
    Ok(VoteStatus::Pending { yes, no, eligible: eligible.len() as u32 })
}

/// Tallies whatever ballots exist (missing votes count as "no") and
/// applies the outcome. Also the vote-window expiry path.
pub fn resolve(room: &mut Room, now: u64) -> Vec<ServerEvent> {
    let eligible = eligible_voters(room);
    let yes = eligible
        .iter()
        .filter(|p| room.game.votes.get(p) == Some(&Vote::Yes))
        .count();
    let passed = rules::majority_reached(yes, eligible.len());

    room.game.votes.clear();
    room.game.vote_end_at = None;

    let mut events = vec![ServerEvent::VoteResolved {
        outcome: if passed { VoteOutcome::Passed } else { VoteOutcome::Failed },
        yes: yes as u32,
        eligible: eligible.len() as u32,
    }];

    if passed {
        events.extend(continue_play(room));
    } else {
        events.extend(stop_play(room, now));
    }
    events
}

/// Majority yes: back to ROLE_PICK for another game.
fn continue_play(room: &mut Room) -> Vec<ServerEvent> {
    room.header.game_no += 1;
    room.game.reset_for_new_game();
    room.ops.clear();

    let mut events = Vec::new();
    match room.header.mode {
        scrawl_protocol::Mode::Single => {
            // Roles are rerolled from scratch, GM included.
            room.roles = Default::default();
        }
        scrawl_protocol::Mode::Vs => {
            // Seeded GM rotation, preferring someone new; the incoming
            // GM leaves their team.
            let next_gm = roles::rotate_gm(room).ok();
            room.roles.clear_round_roles();
            room.roles.gm = next_gm.clone();
            if let Some(gm) = next_gm {
                if let Some(p) = room.players.get_mut(&gm) {
                    p.team = None;
                }
                events.push(ServerEvent::TeamsUpdated { teams: room.teams() });
            }
        }
    }

    // GAME_END -> ROLE_PICK is on the allowed-edge table.
    room.header.state = RoomState::RolePick;
    events.push(ServerEvent::RoomStateChanged { state: RoomState::RolePick });
    events
}

/// No majority: SINGLE rests at GAME_END; VS shows the identity-stripped
/// leaderboard, then the lazy clock wipes the canvases and drops the
/// room back to the lobby.
fn stop_play(room: &mut Room, now: u64) -> Vec<ServerEvent> {
    room.game.phase = Phase::Idle;
    let mut events = Vec::new();

    if room.header.mode == scrawl_protocol::Mode::Vs {
        room.roles = Default::default();
        for p in room.players.values_mut() {
            p.team = None;
        }
        room.game.clear_ops_at = Some(now + CLEAR_OPS_DELAY_SEC);
        room.game.reset_at = Some(now + LEADERBOARD_RESET_SEC);
        events.push(ServerEvent::TeamsUpdated {
            teams: [(Team::A, Vec::new()), (Team::B, Vec::new())].into(),
        });
    }

    events.push(ServerEvent::PhaseChanged {
        phase: Phase::Idle,
        round_no: room.game.round_no,
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_protocol::{Mode, RoomCode};
    use scrawl_store::Player;

    fn voting_room(mode: Mode, names: &[&str]) -> Room {
        let mut room = Room::new(RoomCode::from("VOTE01"), mode, 8, 100, 1800);
        for name in names {
            let pid = Pid::from(*name);
            room.players.insert(pid.clone(), Player::new(pid, (*name).into(), 100));
        }
        room.roles.gm = Some(Pid::from(names[0]));
        room.header.state = RoomState::GameEnd;
        room.game.phase = Phase::Voting;
        room.game.vote_end_at = Some(1000);
        room
    }

    #[test]
    fn test_vote_outside_voting_phase_is_rejected() {
        let mut room = voting_room(Mode::Single, &["gm", "p1"]);
        room.game.phase = Phase::Idle;
        let err = cast_vote(&mut room, &Pid::from("p1"), Vote::Yes, 500).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadPhase);
    }

    #[test]
    fn test_inactive_voter_is_rejected() {
        let mut room = voting_room(Mode::Single, &["gm", "p1"]);
        room.player_mut(&Pid::from("p1")).unwrap().connected = false;
        let err = cast_vote(&mut room, &Pid::from("p1"), Vote::Yes, 500).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotActive);
    }

    #[test]
    fn test_partial_vote_reports_progress() {
        let mut room = voting_room(Mode::Single, &["gm", "p1", "p2"]);
        let status = cast_vote(&mut room, &Pid::from("p1"), Vote::Yes, 500).unwrap();
        assert_eq!(status, VoteStatus::Pending { yes: 1, no: 0, eligible: 3 });
    }

    #[test]
    fn test_all_voted_resolves_immediately() {
        let mut room = voting_room(Mode::Single, &["gm", "p1"]);
        cast_vote(&mut room, &Pid::from("gm"), Vote::Yes, 500).unwrap();
        let status = cast_vote(&mut room, &Pid::from("p1"), Vote::Yes, 500).unwrap();
        match status {
            VoteStatus::Resolved(events) => {
                assert!(matches!(
                    events[0],
                    ServerEvent::VoteResolved { outcome: VoteOutcome::Passed, yes: 2, eligible: 2 }
                ));
                assert_eq!(room.header.state, RoomState::RolePick);
                assert_eq!(room.roles.gm, None);
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[test]
    fn test_disconnected_ballots_are_dropped_on_recast() {
        let mut room = voting_room(Mode::Single, &["gm", "p1", "p2"]);
        cast_vote(&mut room, &Pid::from("p2"), Vote::No, 500).unwrap();
        room.player_mut(&Pid::from("p2")).unwrap().connected = false;
        cast_vote(&mut room, &Pid::from("gm"), Vote::Yes, 500).unwrap();
        // p2's stale ballot is gone; only gm and p1 remain eligible.
        let status = cast_vote(&mut room, &Pid::from("p1"), Vote::Yes, 500).unwrap();
        assert!(matches!(
            status,
            VoteStatus::Resolved(ref events) if matches!(
                events[0],
                ServerEvent::VoteResolved { outcome: VoteOutcome::Passed, yes: 2, eligible: 2 }
            )
        ));
    }

    #[test]
    fn test_window_expiry_counts_missing_as_no() {
        let mut room = voting_room(Mode::Vs, &["gm", "p1", "p2", "p3", "p4"]);
        room.game.votes.insert(Pid::from("p1"), Vote::Yes);
        room.game.votes.insert(Pid::from("p2"), Vote::Yes);
        let events = resolve(&mut room, 1000);
        // 2 yes of 5 eligible: fails, leaderboard path.
        assert!(matches!(
            events[0],
            ServerEvent::VoteResolved { outcome: VoteOutcome::Failed, yes: 2, eligible: 5 }
        ));
        assert_eq!(room.header.state, RoomState::GameEnd);
        assert_eq!(room.game.phase, Phase::Idle);
        assert_eq!(room.game.reset_at, Some(1000 + LEADERBOARD_RESET_SEC));
        assert!(room.players.values().all(|p| p.team.is_none()));
    }

    #[test]
    fn test_vs_pass_rotates_gm_off_their_team() {
        let mut room = voting_room(Mode::Vs, &["gm", "p1", "p2"]);
        for name in ["p1", "p2"] {
            room.player_mut(&Pid::from(name)).unwrap().team = Some(Team::A);
        }
        room.roles.drawer_a = Some(Pid::from("p1"));
        room.roles.drawer_b = Some(Pid::from("p2"));
        for name in ["gm", "p1", "p2"] {
            cast_vote(&mut room, &Pid::from(name), Vote::Yes, 500).unwrap();
        }
        assert_eq!(room.header.state, RoomState::RolePick);
        assert_eq!(room.header.game_no, 1);
        let gm = room.roles.gm.clone().expect("a GM was rotated in");
        assert_ne!(gm, Pid::from("gm"));
        assert_eq!(room.players[&gm].team, None);
        assert_eq!(room.roles.drawer_a, None);
        assert_eq!(room.roles.drawer_b, None);
    }

    #[test]
    fn test_points_survive_a_failed_vs_vote() {
        let mut room = voting_room(Mode::Vs, &["gm", "p1"]);
        room.player_mut(&Pid::from("p1")).unwrap().points = 3;
        resolve(&mut room, 1000);
        assert_eq!(room.players[&Pid::from("p1")].points, 3);
    }
}
