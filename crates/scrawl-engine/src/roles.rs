//! Seeded role assignment.
//!
//! Every random pick uses a `StdRng` seeded from the room code, game
//! number, and a per-decision suffix, so assignment is reproducible in
//! tests and across handler retries.

use std::hash::{DefaultHasher, Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use scrawl_protocol::{ErrorCode, Pid, Team};
use scrawl_store::Room;

use crate::error::Reject;

fn rng_for(room: &Room, suffix: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    room.header.code.as_str().hash(&mut hasher);
    room.header.game_no.hash(&mut hasher);
    suffix.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

fn pick(room: &Room, suffix: &str, candidates: &[Pid]) -> Option<Pid> {
    let mut rng = rng_for(room, suffix);
    candidates.choose(&mut rng).cloned()
}

/// SINGLE: ensure a GM exists, then pick a drawer from the remaining
/// active players. Everyone else guesses implicitly.
pub fn assign_single(room: &mut Room) -> Result<(), Reject> {
    let active: Vec<Pid> = room.active_players().map(|p| p.pid.clone()).collect();
    if active.len() < 2 {
        return Err(Reject::new(
            ErrorCode::NotEnoughPlayers,
            "need at least a GM and a drawer",
        ));
    }

    let gm_alive = room
        .roles
        .gm
        .as_ref()
        .is_some_and(|gm| active.contains(gm));
    if !gm_alive {
        room.roles.gm = pick(room, "gm", &active);
    }
    let gm = room.roles.gm.clone();

    let rest: Vec<Pid> = active
        .into_iter()
        .filter(|pid| Some(pid) != gm.as_ref())
        .collect();
    room.roles.drawer = pick(room, "drawer", &rest);
    room.roles.drawer_a = None;
    room.roles.drawer_b = None;
    Ok(())
}

/// VS: one drawer per team, GM excluded, preferring a member who was not
/// the team's previous drawer. The GM may override either pick with an
/// explicit member of that team.
pub fn assign_vs(
    room: &mut Room,
    drawer_a: Option<Pid>,
    drawer_b: Option<Pid>,
) -> Result<(), Reject> {
    let teams = room.teams();
    let previous = (room.roles.drawer_a.clone(), room.roles.drawer_b.clone());

    let picked_a = pick_team_drawer(room, Team::A, &teams[&Team::A], drawer_a, previous.0)?;
    let picked_b = pick_team_drawer(room, Team::B, &teams[&Team::B], drawer_b, previous.1)?;

    room.roles.drawer = None;
    room.roles.drawer_a = Some(picked_a);
    room.roles.drawer_b = Some(picked_b);
    Ok(())
}

fn pick_team_drawer(
    room: &Room,
    team: Team,
    roster: &[Pid],
    requested: Option<Pid>,
    previous: Option<Pid>,
) -> Result<Pid, Reject> {
    let eligible: Vec<Pid> = roster
        .iter()
        .filter(|pid| room.players.get(pid).is_some_and(|p| p.is_active()))
        .cloned()
        .collect();
    if eligible.is_empty() {
        return Err(Reject::new(
            ErrorCode::NotEnoughPlayers,
            format!("team {team} has no eligible members"),
        ));
    }

    if let Some(pid) = requested {
        if !eligible.contains(&pid) {
            return Err(Reject::new(
                ErrorCode::InvalidTarget,
                format!("{pid} is not an active member of team {team}"),
            ));
        }
        return Ok(pid);
    }

    // Rotation fairness: don't hand the pen to last round's drawer when
    // the team has anyone else.
    let fresh: Vec<Pid> = eligible
        .iter()
        .filter(|pid| Some(*pid) != previous.as_ref())
        .cloned()
        .collect();
    let pool = if fresh.is_empty() { &eligible } else { &fresh };

    let suffix = format!("drawer_{team}");
    pick(room, &suffix, pool).ok_or_else(|| {
        Reject::new(
            ErrorCode::NotEnoughPlayers,
            format!("team {team} has no eligible members"),
        )
    })
}

/// Post-vote GM rotation: seeded pick among active players, excluding
/// the outgoing GM when anyone else is available.
pub fn rotate_gm(room: &Room) -> Result<Pid, Reject> {
    let active: Vec<Pid> = room.active_players().map(|p| p.pid.clone()).collect();
    if active.is_empty() {
        return Err(Reject::new(
            ErrorCode::NotEnoughPlayers,
            "no connected players to take over as GM",
        ));
    }
    let others: Vec<Pid> = active
        .iter()
        .filter(|pid| Some(*pid) != room.roles.gm.as_ref())
        .cloned()
        .collect();
    let pool = if others.is_empty() { &active } else { &others };
    pick(room, "rotate_gm", pool).ok_or_else(|| {
        Reject::new(ErrorCode::NotEnoughPlayers, "no connected players to take over as GM")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_protocol::{Mode, RoomCode};
    use scrawl_store::Player;

    fn room_with(names: &[(&str, Option<Team>)]) -> Room {
        let mut room = Room::new(RoomCode::from("SEED42"), Mode::Vs, 8, 100, 1800);
        for (name, team) in names {
            let pid = Pid::from(*name);
            let mut p = Player::new(pid.clone(), (*name).into(), 100);
            p.team = *team;
            room.players.insert(pid, p);
        }
        room
    }

    #[test]
    fn test_single_assignment_is_deterministic() {
        let mut a = room_with(&[("p1", None), ("p2", None), ("p3", None)]);
        a.header.mode = Mode::Single;
        let mut b = a.clone();
        assign_single(&mut a).unwrap();
        assign_single(&mut b).unwrap();
        assert_eq!(a.roles, b.roles);
        assert!(a.roles.gm.is_some());
        assert!(a.roles.drawer.is_some());
        assert_ne!(a.roles.gm, a.roles.drawer);
    }

    #[test]
    fn test_single_needs_two_active_players() {
        let mut room = room_with(&[("p1", None)]);
        let err = assign_single(&mut room).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotEnoughPlayers);
    }

    #[test]
    fn test_vs_assigns_one_drawer_per_team() {
        let mut room = room_with(&[
            ("gm", None),
            ("a1", Some(Team::A)),
            ("a2", Some(Team::A)),
            ("b1", Some(Team::B)),
            ("b2", Some(Team::B)),
        ]);
        room.roles.gm = Some(Pid::from("gm"));
        assign_vs(&mut room, None, None).unwrap();
        let da = room.roles.drawer_a.clone().unwrap();
        let db = room.roles.drawer_b.clone().unwrap();
        assert!(room.players[&da].team == Some(Team::A));
        assert!(room.players[&db].team == Some(Team::B));
    }

    #[test]
    fn test_vs_rotation_avoids_previous_drawer() {
        let mut room = room_with(&[
            ("gm", None),
            ("a1", Some(Team::A)),
            ("a2", Some(Team::A)),
            ("b1", Some(Team::B)),
            ("b2", Some(Team::B)),
        ]);
        room.roles.gm = Some(Pid::from("gm"));
        room.roles.drawer_a = Some(Pid::from("a1"));
        room.roles.drawer_b = Some(Pid::from("b2"));
        assign_vs(&mut room, None, None).unwrap();
        assert_eq!(room.roles.drawer_a, Some(Pid::from("a2")));
        assert_eq!(room.roles.drawer_b, Some(Pid::from("b1")));
    }

    #[test]
    fn test_vs_empty_team_is_an_error() {
        let mut room = room_with(&[("gm", None), ("a1", Some(Team::A))]);
        room.roles.gm = Some(Pid::from("gm"));
        let err = assign_vs(&mut room, None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotEnoughPlayers);
    }

    #[test]
    fn test_vs_override_must_be_on_the_team() {
        let mut room = room_with(&[
            ("gm", None),
            ("a1", Some(Team::A)),
            ("b1", Some(Team::B)),
        ]);
        room.roles.gm = Some(Pid::from("gm"));
        let err = assign_vs(&mut room, Some(Pid::from("b1")), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTarget);
    }

    #[test]
    fn test_rotate_gm_excludes_current_gm() {
        let mut room = room_with(&[("gm", None), ("p1", None), ("p2", None)]);
        room.roles.gm = Some(Pid::from("gm"));
        let next = rotate_gm(&room).unwrap();
        assert_ne!(next, Pid::from("gm"));
    }

    #[test]
    fn test_rotate_gm_falls_back_to_sole_player() {
        let mut room = room_with(&[("gm", None)]);
        room.roles.gm = Some(Pid::from("gm"));
        assert_eq!(rotate_gm(&room).unwrap(), Pid::from("gm"));
    }
}
